//! Auction lot catalog.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dynasty {
    Song,
    Yuan,
    Ming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Upcoming,
    Live,
    Sold,
}

/// One auction lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: u32,
    pub lot_number: &'static str,
    pub title: &'static str,
    pub chinese: &'static str,
    pub dynasty: Dynasty,
    pub dynasty_info: &'static str,
    /// USD.
    pub reserve_price: u64,
    pub estimate_range: &'static str,
    pub status: LotStatus,
    pub auction_date: &'static str,
    pub fractional_available: bool,
    pub description: &'static str,
    pub images: &'static [&'static str],
}

/// Source of auction lots, in display order.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn lots(&self) -> Vec<Lot>;
}

/// The fixed catalog bundled with the site.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

const LOTS: [Lot; 5] = [
    Lot {
        id: 1,
        lot_number: "001",
        title: "AN EXCEPTIONALLY RARE RU KILN SUNFLOWER-FORM WASHER",
        chinese: "北宋 汝官窯天青釉葵花洗",
        dynasty: Dynasty::Song,
        dynasty_info: "Northern Song Dynasty, 1086-1106",
        reserve_price: 35_000_000,
        estimate_range: "$35M - $55M",
        status: LotStatus::Upcoming,
        auction_date: "Q1 2025",
        fractional_available: true,
        description: "One of fewer than 100 Ru ware pieces known to exist worldwide.",
        images: &["/assets/images/relics/001-song-ru-washer/main.jpg"],
    },
    Lot {
        id: 2,
        lot_number: "002",
        title: "AN IMPERIAL RU KILN \"SKY BLUE\" BOTTLE",
        chinese: "北宋 汝窯天青釉瓶",
        dynasty: Dynasty::Song,
        dynasty_info: "Northern Song Dynasty, 1086-1106",
        reserve_price: 40_000_000,
        estimate_range: "$40M - $75M",
        status: LotStatus::Upcoming,
        auction_date: "Q1 2025",
        fractional_available: true,
        description: "Exemplifies the restraint and elegance of the finest Ru ware.",
        images: &["/assets/images/relics/002-song-ru-bottle/main.jpg"],
    },
    Lot {
        id: 3,
        lot_number: "003",
        title: "A MAGNIFICENT MING XUANDE CLOISONNÉ TRIPOD CENSER",
        chinese: "明宣德 掐絲琺瑯獸鈕蓮紋三足爐",
        dynasty: Dynasty::Ming,
        dynasty_info: "Xuande Period (1426-1435)",
        reserve_price: 12_000_000,
        estimate_range: "$12M - $27M",
        status: LotStatus::Upcoming,
        auction_date: "Q2 2025",
        fractional_available: true,
        description: "Golden age of Chinese cloisonné production.",
        images: &["/assets/images/relics/003-ming-cloisonne/main.jpg"],
    },
    Lot {
        id: 4,
        lot_number: "004",
        title: "AN EXTRAORDINARILY RARE YUAN JILAN-GLAZED EWER",
        chinese: "元 霽藍釉白龍紋梨形執壺",
        dynasty: Dynasty::Yuan,
        dynasty_info: "Yuan Dynasty (1271-1368)",
        reserve_price: 12_500_000,
        estimate_range: "$12.5M - $28M",
        status: LotStatus::Upcoming,
        auction_date: "Q2 2025",
        fractional_available: true,
        description: "Spectacular ewer showcasing Yuan Dynasty mastery.",
        images: &["/assets/images/relics/004-yuan-jilan-ewer/main.jpg"],
    },
    Lot {
        id: 5,
        lot_number: "005",
        title: "IMPERIAL JINGTAI CLOISONNÉ LOTUS PATTERN LIDDED CASKET",
        chinese: "明景泰 掐絲琺瑯蓮紋蓋盒",
        dynasty: Dynasty::Ming,
        dynasty_info: "Jingtai Period (1450-1457)",
        reserve_price: 8_000_000,
        estimate_range: "$8M - $12M",
        status: LotStatus::Upcoming,
        auction_date: "Q3 2025",
        fractional_available: true,
        description: "Masterpiece of Chinese decorative arts.",
        images: &["/assets/images/relics/005-ming-jingtai-casket/main.jpg"],
    },
];

#[async_trait::async_trait]
impl CatalogProvider for StaticCatalog {
    async fn lots(&self) -> Vec<Lot> {
        LOTS.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_catalog_order() {
        let lots = StaticCatalog.lots().await;
        let ids: Vec<u32> = lots.iter().map(|lot| lot.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert!(lots.iter().all(|lot| lot.status == LotStatus::Upcoming && lot.fractional_available));
    }

    #[tokio::test]
    async fn test_lot_serialization() {
        let lots = StaticCatalog.lots().await;
        let json = serde_json::to_value(&lots[3]).unwrap();
        assert_eq!(json["lotNumber"], "004");
        assert_eq!(json["dynasty"], "yuan");
        assert_eq!(json["reservePrice"], 12_500_000);
        assert_eq!(json["images"][0], "/assets/images/relics/004-yuan-jilan-ewer/main.jpg");
    }
}
