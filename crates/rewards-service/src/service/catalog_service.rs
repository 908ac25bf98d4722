//! 商户与奖励目录服务
//!
//! 只读查询。携带坐标时按 Haversine 距离过滤和排序。

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::instrument;

use super::dto::{PartnerDetail, PartnerQuery};
use crate::error::{Result, RewardsError};
use crate::models::{PartnerSummary, Reward, RewardDetail, RewardFilter, round_tenth};
use crate::repository::CatalogRepositoryTrait;

/// 默认搜索半径（公里）
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

pub struct CatalogService {
    catalog: Arc<dyn CatalogRepositoryTrait>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepositoryTrait>) -> Self {
        Self { catalog }
    }

    /// 商户列表
    ///
    /// 没有坐标时按名称排序；有坐标时剔除半径外的商户（无坐标的商户保留），
    /// 按距离从近到远排序，距离未知的排在最后
    #[instrument(skip(self))]
    pub async fn list_partners(&self, query: PartnerQuery) -> Result<Vec<PartnerSummary>> {
        let partners = self.catalog.list_partners(query.category.clone()).await?;

        let (Some(lat), Some(lng)) = (query.lat, query.lng) else {
            return Ok(partners);
        };
        let radius = query.radius_km.unwrap_or(DEFAULT_RADIUS_KM);

        let mut nearby: Vec<PartnerSummary> = partners
            .into_iter()
            .map(|mut summary| {
                summary.distance_km = summary.partner.distance_from(lat, lng).map(round_tenth);
                summary
            })
            .filter(|summary| summary.distance_km.is_none_or(|d| d <= radius))
            .collect();

        nearby.sort_by(|a, b| match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Ok(nearby)
    }

    /// 商户详情及启用奖励（价格从低到高）
    pub async fn get_partner(&self, id: &str) -> Result<PartnerDetail> {
        let partner = self
            .catalog
            .get_partner(id)
            .await?
            .ok_or_else(|| RewardsError::PartnerNotFound(id.to_string()))?;
        let rewards = self.catalog.list_partner_rewards(id).await?;

        Ok(PartnerDetail { partner, rewards })
    }

    pub async fn list_partner_rewards(&self, id: &str) -> Result<Vec<Reward>> {
        if self.catalog.get_partner(id).await?.is_none() {
            return Err(RewardsError::PartnerNotFound(id.to_string()));
        }
        self.catalog.list_partner_rewards(id).await
    }

    pub async fn list_rewards(&self, filter: RewardFilter) -> Result<Vec<RewardDetail>> {
        self.catalog.list_rewards(filter).await
    }

    pub async fn get_reward(&self, id: &str) -> Result<RewardDetail> {
        self.catalog
            .get_reward(id)
            .await?
            .ok_or_else(|| RewardsError::RewardNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Partner;
    use crate::repository::MockCatalogRepositoryTrait;
    use chrono::Utc;

    fn summary(id: &str, name: &str, coords: Option<(f64, f64)>) -> PartnerSummary {
        PartnerSummary {
            partner: Partner {
                id: id.to_string(),
                name: name.to_string(),
                description: None,
                address: None,
                latitude: coords.map(|c| c.0),
                longitude: coords.map(|c| c.1),
                image_url: None,
                category: "cafe".to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
            reward_count: 2,
            distance_km: None,
        }
    }

    fn catalog_with(partners: Vec<PartnerSummary>) -> CatalogService {
        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog
            .expect_list_partners()
            .returning(move |_| Ok(partners.clone()));
        CatalogService::new(Arc::new(catalog))
    }

    #[tokio::test]
    async fn test_without_location_keeps_repository_order() {
        let service = catalog_with(vec![
            summary("p-a", "Alpha", Some((51.54, -0.02))),
            summary("p-b", "Beta", None),
        ]);

        let partners = service.list_partners(PartnerQuery::default()).await.unwrap();
        assert_eq!(partners.len(), 2);
        assert!(partners.iter().all(|p| p.distance_km.is_none()));
    }

    #[tokio::test]
    async fn test_location_filters_and_sorts_by_distance() {
        let service = catalog_with(vec![
            summary("far", "Far Away", Some((48.8566, 2.3522))),
            summary("unknown", "No Coordinates", None),
            summary("near2", "Second", Some((51.5432, -0.0211))),
            summary("near1", "First", Some((51.5387, -0.0166))),
        ]);

        let partners = service
            .list_partners(PartnerQuery {
                lat: Some(51.5387),
                lng: Some(-0.0166),
                ..PartnerQuery::default()
            })
            .await
            .unwrap();

        let ids: Vec<&str> = partners.iter().map(|p| p.partner.id.as_str()).collect();
        assert_eq!(ids, vec!["near1", "near2", "unknown"]);
        assert_eq!(partners[0].distance_km, Some(0.0));
        assert!(partners[1].distance_km.unwrap() > 0.0);
        assert!(partners[2].distance_km.is_none());
    }

    #[tokio::test]
    async fn test_get_partner_not_found() {
        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog.expect_get_partner().returning(|_| Ok(None));

        let service = CatalogService::new(Arc::new(catalog));
        assert!(matches!(
            service.get_partner("nope").await,
            Err(RewardsError::PartnerNotFound(_))
        ));
    }
}
