use serde::Serialize;

use crate::models::{ShortRecipe, UserProfile};

/// A followed author with a preview of their recipes
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserFields;

    #[test]
    fn test_subscription_shape() {
        let subscription = Subscription {
            author: UserProfile {
                fields: UserFields {
                    email: "chef@example.com".to_string(),
                    id: 2,
                    username: "chef".to_string(),
                    first_name: "Gordon".to_string(),
                    last_name: "Chef".to_string(),
                },
                is_subscribed: true,
            },
            recipes: vec![ShortRecipe {
                id: 10,
                name: "Risotto".to_string(),
                image: "/media/recipes/abc.png".to_string(),
                cooking_time: 40,
            }],
            recipes_count: 5,
        };

        let value = serde_json::to_value(&subscription).unwrap();
        assert_eq!(value["username"], "chef");
        assert_eq!(value["is_subscribed"], true);
        assert_eq!(value["recipes"][0]["name"], "Risotto");
        assert_eq!(value["recipes_count"], 5);
    }
}
