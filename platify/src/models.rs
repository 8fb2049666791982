use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` the same as a missing field.
///
/// The catalog API emits `null` for empty lists and strings, which serde would
/// otherwise reject for non-`Option` fields.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope returned by `GET /recipes/{id}`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecipeResponse {
    pub recipe: Recipe,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Hero image reference
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    #[serde(default, deserialize_with = "nullable")]
    pub boards: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<Tag>,
    #[serde(default, deserialize_with = "nullable")]
    pub sections: Vec<Section>,
}

/// A display label. Uniqueness is up to the catalog, not us.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub light_color: String,
    #[serde(deserialize_with = "nullable")]
    pub dark_color: String,
}

/// A named part of a recipe.
///
/// Any combination of ingredients, nutrition items, directions, video and
/// shopping list may be present at once.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub ingredients: Vec<Ingredient>,
    #[serde(deserialize_with = "nullable")]
    pub items: Vec<NutritionItem>,
    #[serde(deserialize_with = "nullable")]
    pub directions: Vec<Direction>,
    pub video_link: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub list: Vec<ShoppingItem>,
}

/// Quantity and unit are display strings; the catalog does not guarantee
/// a numeric quantity.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Ingredient {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub quantity: String,
    #[serde(deserialize_with = "nullable")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Direction {
    pub heading: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub text: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NutritionItem {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub thumbnail: String,
    pub quantity: f64,
    #[serde(deserialize_with = "nullable")]
    pub unit: String,
    pub nutrients: Nutrients,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct Nutrients {
    pub energy: f64,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ShoppingItem {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

/// A single product, flattened to one nutrition fact.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "nullable")]
    pub unit: String,
    #[serde(default)]
    pub nutrients: Nutrients,
}

/// Body of `GET /products`, either a bare array or wrapped in `products`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProductList {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl From<ProductList> for Vec<Product> {
    fn from(list: ProductList) -> Self {
        match list {
            ProductList::Bare(products) | ProductList::Wrapped { products } => products,
        }
    }
}
