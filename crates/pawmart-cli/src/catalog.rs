//! # Seed Subcommand
//!
//! Loads a YAML catalog and upserts it into the database.
//!
//! ```yaml
//! products:
//!   - name: Squeaky Ball
//!     category: toys
//!     species: [dog]
//!     price: "4.99"
//!     stock: 40
//! pets:
//!   - name: Biscuit
//!     species: dog
//!     age_months: 14
//!     size: medium
//!     sex: male
//!     adoption_fee: "120.00"
//! team:
//!   - name: Ada
//!     position: Adoption coordinator
//! ```
//!
//! Products are matched by slug and overwritten. Pets are matched by name
//! and species and left untouched when already listed. Team members are
//! matched by name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use pawmart_api::extractors::Validate;
use pawmart_api::routes::pets::PetInput;
use pawmart_api::routes::products::ProductInput;
use pawmart_api::state::{PetRecord, ProductRecord, TeamMemberRecord};
use pawmart_core::catalog::slugify;
use pawmart_core::fields::{optional_text, require_text};
use pawmart_core::AdoptionStatus;
use serde::Deserialize;
use uuid::Uuid;

/// Arguments for the `pawmart seed` subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Path to the catalog YAML file.
    pub catalog: PathBuf,

    /// Print what would change without touching the database.
    #[arg(long)]
    pub dry_run: bool,
}

/// A team member entry in the catalog file.
#[derive(Debug, Deserialize)]
pub struct TeamEntry {
    pub name: String,
    pub position: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

/// Parsed catalog file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<ProductInput>,
    #[serde(default)]
    pub pets: Vec<PetInput>,
    #[serde(default)]
    pub team: Vec<TeamEntry>,
}

impl CatalogFile {
    /// Slug a product entry will be stored under.
    pub fn slug_of(entry: &ProductInput) -> String {
        slugify(entry.slug.as_deref().unwrap_or(&entry.name))
    }

    /// Check every entry with the rules the admin API applies.
    pub fn validate(&self) -> Result<()> {
        let mut slugs = HashSet::new();
        for (i, product) in self.products.iter().enumerate() {
            require_text("name", &product.name, 200)?;
            if let Err(msg) = product.validate() {
                bail!("products[{i}] ({}): {msg}", product.name);
            }
            let slug = Self::slug_of(product);
            if slug.is_empty() {
                bail!("products[{i}] ({}): slug must contain a letter or digit", product.name);
            }
            if !slugs.insert(slug.clone()) {
                bail!("products[{i}]: duplicate slug {slug}");
            }
        }
        for (i, pet) in self.pets.iter().enumerate() {
            require_text("name", &pet.name, 100)?;
            if let Err(msg) = pet.validate() {
                bail!("pets[{i}] ({}): {msg}", pet.name);
            }
        }
        for member in &self.team {
            require_text("name", &member.name, 120)?;
            require_text("position", &member.position, 120)?;
        }
        Ok(())
    }
}

/// Load and validate a catalog file.
pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let catalog: CatalogFile = crate::read_yaml(path)?;
    catalog.validate()?;
    Ok(catalog)
}

/// Records to write, with counts for reporting.
#[derive(Debug, Default)]
pub struct SeedPlan {
    pub products: Vec<ProductRecord>,
    pub pets: Vec<PetRecord>,
    pub team: Vec<TeamMemberRecord>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Merge a catalog into what is already stored.
pub fn plan_seed(
    catalog: &CatalogFile,
    existing_products: &[ProductRecord],
    existing_pets: &[PetRecord],
    existing_team: &[TeamMemberRecord],
    now: DateTime<Utc>,
) -> Result<SeedPlan> {
    let mut plan = SeedPlan::default();

    for entry in &catalog.products {
        let slug = CatalogFile::slug_of(entry);
        let existing = existing_products.iter().find(|p| p.slug == slug);
        let (id, created_at) = match existing {
            Some(p) => {
                plan.updated += 1;
                (p.id, p.created_at)
            }
            None => {
                plan.created += 1;
                (Uuid::new_v4(), now)
            }
        };
        plan.products.push(ProductRecord {
            id,
            slug,
            name: require_text("name", &entry.name, 200)?,
            description: entry.description.trim().to_string(),
            category: entry.category,
            species: entry.species.clone(),
            price: entry.price,
            compare_at_price: entry.compare_at_price,
            stock: entry.stock,
            images: entry.images.clone(),
            featured: entry.featured,
            active: entry.active,
            created_at,
            updated_at: now,
        });
    }

    for entry in &catalog.pets {
        let name = require_text("name", &entry.name, 100)?;
        if existing_pets
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&name) && p.species == entry.species)
        {
            plan.skipped += 1;
            continue;
        }
        plan.created += 1;
        plan.pets.push(PetRecord {
            id: Uuid::new_v4(),
            name,
            species: entry.species,
            breed: optional_text("breed", entry.breed.as_deref(), 100)?,
            age_months: entry.age_months,
            size: entry.size,
            sex: entry.sex,
            description: entry.description.trim().to_string(),
            images: entry.images.clone(),
            adoption_fee: entry.adoption_fee,
            status: entry.status.unwrap_or(AdoptionStatus::Available),
            vaccinated: entry.vaccinated,
            neutered: entry.neutered,
            created_at: now,
            updated_at: now,
        });
    }

    for entry in &catalog.team {
        let name = require_text("name", &entry.name, 120)?;
        let existing = existing_team.iter().find(|m| m.name == name);
        let (id, created_at, email, active) = match existing {
            Some(m) => {
                plan.updated += 1;
                (m.id, m.created_at, m.email.clone(), m.active)
            }
            None => {
                plan.created += 1;
                (Uuid::new_v4(), now, None, true)
            }
        };
        plan.team.push(TeamMemberRecord {
            id,
            name,
            position: require_text("position", &entry.position, 120)?,
            bio: optional_text("bio", entry.bio.as_deref(), 2000)?,
            photo_url: optional_text("photo_url", entry.photo_url.as_deref(), 500)?,
            email,
            display_order: entry.display_order,
            active,
            created_at,
            updated_at: now,
        });
    }

    Ok(plan)
}

/// Execute the seed subcommand.
pub fn run_seed(args: &SeedArgs) -> Result<u8> {
    let catalog = load_catalog(&args.catalog)?;
    tracing::info!(
        products = catalog.products.len(),
        pets = catalog.pets.len(),
        team = catalog.team.len(),
        "catalog loaded"
    );

    if args.dry_run {
        let plan = plan_seed(&catalog, &[], &[], &[], Utc::now())?;
        for p in &plan.products {
            println!("product  {:<32} {:>8}  stock {}", p.slug, p.price.to_string(), p.stock);
        }
        for p in &plan.pets {
            println!("pet      {:<32} {}", p.name, p.species.as_str());
        }
        for m in &plan.team {
            println!("team     {:<32} {}", m.name, m.position);
        }
        println!("dry run: {} record(s) validated", plan.created);
        return Ok(0);
    }

    crate::runtime()?.block_on(seed_database(&catalog))
}

async fn seed_database(catalog: &CatalogFile) -> Result<u8> {
    use pawmart_api::db::documents;

    let pool = crate::connect_from_env().await?;
    let products = documents::load_all::<ProductRecord>(&pool).await?;
    let pets = documents::load_all::<PetRecord>(&pool).await?;
    let team = documents::load_all::<TeamMemberRecord>(&pool).await?;

    let plan = plan_seed(catalog, &products, &pets, &team, Utc::now())?;
    for product in &plan.products {
        documents::upsert(&pool, product).await?;
    }
    for pet in &plan.pets {
        documents::upsert(&pool, pet).await?;
    }
    for member in &plan.team {
        documents::upsert(&pool, member).await?;
    }

    tracing::info!(
        created = plan.created,
        updated = plan.updated,
        skipped = plan.skipped,
        "catalog seeded"
    );
    println!(
        "seeded: {} created, {} updated, {} skipped",
        plan.created, plan.updated, plan.skipped
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawmart_core::{Money, PetSex, PetSize, ProductCategory, Species};
    use std::io::Write;

    const CATALOG: &str = r#"
products:
  - name: Squeaky Ball
    category: toys
    species: [dog]
    price: "4.99"
    stock: 40
  - name: Salmon Kibble 2kg
    category: food
    species: [cat]
    price: "18.50"
    compare_at_price: "22.00"
    stock: 12
pets:
  - name: Biscuit
    species: dog
    age_months: 14
    size: medium
    sex: male
    adoption_fee: "120.00"
team:
  - name: Ada
    position: Adoption coordinator
    display_order: 1
"#;

    fn write(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_catalog() {
        let file = write(CATALOG);
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.products.len(), 2);
        assert_eq!(catalog.products[1].category, ProductCategory::Food);
        assert_eq!(catalog.pets[0].size, PetSize::Medium);
        assert_eq!(catalog.team[0].display_order, 1);
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let file = write(
            r#"
products:
  - {name: "Chew Toy", category: toys, price: "2.00"}
  - {name: "chew  toy!", category: toys, price: "3.00"}
"#,
        );
        let err = load_catalog(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate slug chew-toy"));
    }

    #[test]
    fn rejects_free_products() {
        let file = write("products:\n  - {name: Freebie, category: toys, price: \"0.00\"}\n");
        let err = load_catalog(file.path()).unwrap_err();
        assert!(err.to_string().contains("price must be greater than zero"));
    }

    #[test]
    fn rejects_unknown_category() {
        let file = write("products:\n  - {name: Rocket, category: rockets, price: \"1.00\"}\n");
        assert!(load_catalog(file.path()).is_err());
    }

    #[test]
    fn plan_keeps_ids_of_existing_products_and_skips_known_pets() {
        let file = write(CATALOG);
        let catalog = load_catalog(file.path()).unwrap();
        let now = Utc::now();
        let first = plan_seed(&catalog, &[], &[], &[], now).unwrap();
        assert_eq!(first.created, 4);
        assert_eq!(first.products[0].slug, "squeaky-ball");
        assert_eq!(first.pets[0].status, AdoptionStatus::Available);

        let mut stored = first.products.clone();
        stored[0].stock = 3;
        let mut adopted = first.pets.clone();
        adopted[0].status = AdoptionStatus::Adopted;
        let second = plan_seed(&catalog, &stored, &adopted, &first.team, now).unwrap();
        assert_eq!(second.updated, 3);
        assert_eq!(second.skipped, 1);
        assert!(second.pets.is_empty());
        assert_eq!(second.products[0].id, first.products[0].id);
        assert_eq!(second.products[0].stock, 40);
        assert_eq!(second.products[1].price, Money::from_cents(18_50));
        assert_eq!(second.team[0].id, first.team[0].id);
    }

    #[test]
    fn pet_match_ignores_case_but_not_species() {
        let file = write(CATALOG);
        let catalog = load_catalog(file.path()).unwrap();
        let now = Utc::now();
        let mut existing = plan_seed(&catalog, &[], &[], &[], now).unwrap().pets;
        existing[0].name = "BISCUIT".into();
        existing[0].species = Species::Cat;
        let plan = plan_seed(&catalog, &[], &existing, &[], now).unwrap();
        assert_eq!(plan.pets.len(), 1);
        assert_eq!(plan.pets[0].sex, PetSex::Male);
    }

    #[test]
    fn bundled_fixture_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.yaml");
        let catalog = load_catalog(&path).unwrap();
        assert!(!catalog.products.is_empty());
        assert!(!catalog.pets.is_empty());
    }
}
