//! # Catalog Vocabulary
//!
//! Closed enumerations for product and pet attributes. Each serializes as a
//! fixed lowercase (or, for statuses, upper-case) string so stored documents
//! and query strings can never carry an unknown category.

use serde::{Deserialize, Serialize};

/// Product category shown in the shop navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    /// Dry food, wet food, treats.
    Food,
    /// Toys and enrichment.
    Toys,
    /// Collars, leashes, bowls, carriers.
    Accessories,
    /// Shampoo, brushes, clippers.
    Grooming,
    /// Supplements, flea and tick care.
    Health,
    /// Beds and blankets.
    Beds,
    /// Cages, tanks, terrariums.
    Habitats,
}

impl ProductCategory {
    /// Every category, in navigation order.
    pub const ALL: [ProductCategory; 7] = [
        Self::Food,
        Self::Toys,
        Self::Accessories,
        Self::Grooming,
        Self::Health,
        Self::Beds,
        Self::Habitats,
    ];

    /// Return the string representation of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Toys => "toys",
            Self::Accessories => "accessories",
            Self::Grooming => "grooming",
            Self::Health => "health",
            Self::Beds => "beds",
            Self::Habitats => "habitats",
        }
    }
}

/// Animal species. Used both for pets and to tag which animals a product suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    /// Dogs.
    Dog,
    /// Cats.
    Cat,
    /// Birds.
    Bird,
    /// Fish.
    Fish,
    /// Rabbits, guinea pigs, hamsters.
    SmallAnimal,
    /// Reptiles.
    Reptile,
}

impl Species {
    /// Return the string representation of this species.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
            Self::Bird => "bird",
            Self::Fish => "fish",
            Self::SmallAnimal => "small_animal",
            Self::Reptile => "reptile",
        }
    }
}

/// Adult size class of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetSize {
    /// Small.
    Small,
    /// Medium.
    Medium,
    /// Large.
    Large,
}

/// Sex of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetSex {
    /// Male.
    Male,
    /// Female.
    Female,
}

/// Adoption availability of a pet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdoptionStatus {
    /// Open for visits and adoption.
    Available,
    /// A visit is confirmed; no new reservations are taken.
    Reserved,
    /// Adopted. Kept for the gallery and history.
    Adopted,
}

impl AdoptionStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Adopted => "ADOPTED",
        }
    }
}

impl std::fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a URL slug: lowercase ASCII alphanumerics joined by single dashes.
///
/// Non-ASCII and punctuation act as separators. Returns an empty string if
/// the name has no ASCII alphanumerics at all.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
