use serde::{Deserialize, Serialize};

/// A menu category products are grouped under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Display color (CSS color value).
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            color: None,
            sort_order: None,
            description: None,
            icon: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Which ordering surfaces a product is offered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleOn {
    pub pos: bool,
    pub app: bool,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub tax_rate_id: Option<String>,
    pub visible_on: Option<VisibleOn>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
}

impl Product {
    pub fn new(category_id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: String::new(),
            category_id: category_id.into(),
            name: name.into(),
            description: None,
            price,
            image_url: None,
            tax_rate_id: None,
            visible_on: None,
            ingredients: Vec::new(),
            allergens: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_allergens<I, S>(mut self, allergens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allergens = allergens.into_iter().map(Into::into).collect();
        self
    }
}

/// Orders categories by `sortOrder`, unordered ones last, then by name.
pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        let key = |c: &Category| c.sort_order.unwrap_or(i32::MAX);
        key(a).cmp(&key(b)).then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_categories() {
        let mut categories = vec![
            Category::new("Drinks"),
            Category::new("Burgers").with_sort_order(2),
            Category::new("Starters").with_sort_order(1),
            Category::new("Desserts"),
        ];

        sort_categories(&mut categories);

        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Starters", "Burgers", "Desserts", "Drinks"]);
    }

    #[test]
    fn test_product_json_shape() {
        let product = Product::new("c1", "Fries", 3.5).with_allergens(["gluten"]);
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["categoryId"], "c1");
        assert_eq!(json["allergens"], serde_json::json!(["gluten"]));
        assert_eq!(json["ingredients"], serde_json::json!([]));
    }
}
