//! 示例商户与奖励
//!
//! 本地开发和演示环境在商户表为空时写入。

use chrono::{DateTime, Utc};

use crate::models::{Partner, Reward};

const DEFAULT_CATEGORY: &str = "cafe";

// (id, name, description, address, latitude, longitude)
const PARTNERS: [(&str, &str, &str, &str, f64, f64); 4] = [
    (
        "partner-1",
        "Signorelli Pasticceria",
        "Authentic Italian pastries and coffee",
        "7 Victory Parade, London E20 1AW",
        51.5387,
        -0.0166,
    ),
    (
        "partner-2",
        "Bean & Brew",
        "Specialty coffee roasters",
        "23 High Street, London E15 2QB",
        51.5432,
        -0.0211,
    ),
    (
        "partner-3",
        "Green Pedal Cafe",
        "Cyclist-friendly cafe with bike parking",
        "45 Cycle Lane, London E3 4RT",
        51.5301,
        -0.0298,
    ),
    (
        "partner-4",
        "OA Coffee",
        "Organic artisan coffee",
        "12 Market Square, London E8 1HN",
        51.5445,
        -0.0556,
    ),
];

// (id, partner_id, name, description, points_cost)
const REWARDS: [(&str, &str, &str, &str, i64); 8] = [
    ("reward-1", "partner-1", "Free Espresso", "One free espresso shot", 500),
    ("reward-2", "partner-1", "Pastry of the Day", "Any pastry from the display", 750),
    ("reward-3", "partner-2", "Free Coffee", "Any regular hot drink", 600),
    ("reward-4", "partner-2", "Coffee & Cake Combo", "Regular coffee plus cake slice", 1200),
    ("reward-5", "partner-3", "Cyclist Breakfast", "Full breakfast for cyclists", 2000),
    ("reward-6", "partner-3", "Energy Smoothie", "Post-ride protein smoothie", 800),
    ("reward-7", "partner-4", "Organic Latte", "Large organic latte", 700),
    ("reward-8", "partner-4", "Lunch Deal", "Sandwich + drink combo", 1500),
];

pub fn sample_partners(now: DateTime<Utc>) -> Vec<Partner> {
    PARTNERS
        .iter()
        .map(|(id, name, description, address, lat, lng)| Partner {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            address: Some(address.to_string()),
            latitude: Some(*lat),
            longitude: Some(*lng),
            image_url: None,
            category: DEFAULT_CATEGORY.to_string(),
            is_active: true,
            created_at: now,
        })
        .collect()
}

pub fn sample_rewards(now: DateTime<Utc>) -> Vec<Reward> {
    REWARDS
        .iter()
        .map(|(id, partner_id, name, description, cost)| Reward {
            id: id.to_string(),
            partner_id: partner_id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            points_cost: *cost,
            image_url: None,
            is_active: true,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_reward_belongs_to_a_sample_partner() {
        let now = Utc::now();
        let partners = sample_partners(now);
        let rewards = sample_rewards(now);

        assert_eq!(partners.len(), 4);
        assert_eq!(rewards.len(), 8);
        for reward in &rewards {
            assert!(partners.iter().any(|p| p.id == reward.partner_id));
            assert!(reward.points_cost > 0);
        }
    }
}
