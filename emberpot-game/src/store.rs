//! Shop table and sell pricing.
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardKind};
use crate::constants::{
    DEFAULT_PRODUCT_SELL_VALUE, DEFAULT_SPECIAL_SELL_VALUE, FRESH_FOOD_SELL_VALUE,
    TOOL_SELL_PER_DURABILITY,
};

/// A single item available in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Catalog key of the card handed over on purchase.
    pub card_key: String,
    pub name: String,
    /// Price in coins.
    pub price: u32,
    #[serde(default)]
    pub description: String,
}

/// Read-only view over the catalog's shop table.
#[derive(Debug, Clone, Copy)]
pub struct Shop<'a> {
    items: &'a [ShopItem],
}

impl<'a> Shop<'a> {
    #[must_use]
    pub const fn new(items: &'a [ShopItem]) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn item(&self, card_key: &str) -> Option<&'a ShopItem> {
        self.items.iter().find(|item| item.card_key == card_key)
    }

    #[must_use]
    pub const fn items(&self) -> &'a [ShopItem] {
        self.items
    }
}

/// Coins credited when `card` is sold.
///
/// An explicit non-zero trade value wins; otherwise the type default applies.
#[must_use]
pub fn sell_price(card: &Card) -> u32 {
    if let Some(value) = card.explicit_trade_value().filter(|value| *value > 0) {
        return value;
    }
    match card.kind {
        CardKind::Tool { durability, .. } => durability.saturating_mul(TOOL_SELL_PER_DURABILITY),
        CardKind::Food { .. } => {
            if card.is_spoiled() {
                0
            } else {
                FRESH_FOOD_SELL_VALUE
            }
        }
        CardKind::Auxiliary { uses, .. } => uses,
        CardKind::Special { sell_value, .. } => sell_value.unwrap_or(DEFAULT_SPECIAL_SELL_VALUE),
        CardKind::Product { .. } => DEFAULT_PRODUCT_SELL_VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardId;
    use crate::recipe::Quality;

    fn card(kind: CardKind) -> Card {
        Card {
            id: CardId(1),
            key: String::new(),
            name: "Sample".to_string(),
            card_trait: None,
            kind,
        }
    }

    #[test]
    fn tool_price_tracks_durability() {
        let knife = card(CardKind::Tool {
            durability: 2,
            max_durability: 3,
            role: None,
        });
        assert_eq!(sell_price(&knife), 4);
    }

    #[test]
    fn tool_price_saturates() {
        let anvil = card(CardKind::Tool {
            durability: u32::MAX,
            max_durability: u32::MAX,
            role: None,
        });
        assert_eq!(sell_price(&anvil), u32::MAX);
    }

    #[test]
    fn food_price_depends_on_freshness_and_trade_value() {
        let fresh = card(CardKind::Food {
            spoil_turns: 3,
            remaining_spoil: 2,
            preprocessed: false,
            trade_value: None,
        });
        let spoiled = card(CardKind::Food {
            spoil_turns: 3,
            remaining_spoil: 0,
            preprocessed: false,
            trade_value: None,
        });
        let priced = card(CardKind::Food {
            spoil_turns: 3,
            remaining_spoil: 3,
            preprocessed: true,
            trade_value: Some(3),
        });
        assert_eq!(sell_price(&fresh), 1);
        assert_eq!(sell_price(&spoiled), 0);
        assert_eq!(sell_price(&priced), 3);
    }

    #[test]
    fn specials_use_their_sell_value() {
        let fox = card(CardKind::Special {
            uses: None,
            effect: String::new(),
            role: None,
            sell_value: Some(5),
        });
        let fuel = card(CardKind::Special {
            uses: Some(1),
            effect: String::new(),
            role: None,
            sell_value: None,
        });
        assert_eq!(sell_price(&fox), 5);
        assert_eq!(sell_price(&fuel), 1);
    }

    #[test]
    fn products_and_auxiliaries() {
        let dish = card(CardKind::Product {
            recipe_id: None,
            quality: Quality::Fine,
            heal_value: 6,
            buff_text: String::new(),
            satiety_turns: 2,
            health_bonus: 0,
            trade_value: 4,
        });
        let worthless = card(CardKind::Product {
            recipe_id: None,
            quality: Quality::Normal,
            heal_value: 1,
            buff_text: String::new(),
            satiety_turns: 0,
            health_bonus: 0,
            trade_value: 0,
        });
        let salt = card(CardKind::Auxiliary {
            uses: 3,
            effect: String::new(),
            destroy_on_use: false,
        });
        assert_eq!(sell_price(&dish), 4);
        assert_eq!(sell_price(&worthless), 1);
        assert_eq!(sell_price(&salt), 3);
    }

    #[test]
    fn shop_lookup() {
        let items = vec![
            ShopItem {
                card_key: "knife".to_string(),
                name: "Knife".to_string(),
                price: 5,
                description: String::new(),
            },
            ShopItem {
                card_key: "repair".to_string(),
                name: "Repair Kit".to_string(),
                price: 3,
                description: String::new(),
            },
        ];
        let shop = Shop::new(&items);
        assert_eq!(shop.item("knife").map(|i| i.price), Some(5));
        assert!(shop.item("dragon").is_none());
    }
}
