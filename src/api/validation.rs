//! Validation helpers for API requests.

use crate::error::MatchmakingError;
use crate::types::{JoinId, JoinLobbyRequest, Level, MatchId, Player, MAX_LEVEL, MIN_LEVEL};
use uuid::Uuid;

/// ISO 3166-1 alpha-3 country codes accepted by the lobby
pub const ISO_COUNTRIES: &[&str] = &[
    "AFG", "ALA", "ALB", "DZA", "ASM", "AND", "AGO", "AIA", "ATA", "ATG", "ARG", "ARM",
    "ABW", "AUS", "AUT", "AZE", "BHS", "BHR", "BGD", "BRB", "BLR", "BEL", "BLZ", "BEN",
    "BMU", "BTN", "BOL", "BES", "BIH", "BWA", "BVT", "BRA", "IOT", "BRN", "BGR", "BFA",
    "BDI", "CPV", "KHM", "CMR", "CAN", "CYM", "CAF", "TCD", "CHL", "CHN", "CXR", "CCK",
    "COL", "COM", "COG", "COD", "COK", "CRI", "CIV", "HRV", "CUB", "CUW", "CYP", "CZE",
    "DNK", "DJI", "DMA", "DOM", "ECU", "EGY", "SLV", "GNQ", "ERI", "EST", "SWZ", "ETH",
    "FLK", "FRO", "FJI", "FIN", "FRA", "GUF", "PYF", "ATF", "GAB", "GMB", "GEO", "DEU",
    "GHA", "GIB", "GRC", "GRL", "GRD", "GLP", "GUM", "GTM", "GGY", "GIN", "GNB", "GUY",
    "HTI", "HMD", "VAT", "HND", "HKG", "HUN", "ISL", "IND", "IDN", "IRN", "IRQ", "IRL",
    "IMN", "ISR", "ITA", "JAM", "JPN", "JEY", "JOR", "KAZ", "KEN", "KIR", "PRK", "KOR",
    "KWT", "KGZ", "LAO", "LVA", "LBN", "LSO", "LBR", "LBY", "LIE", "LTU", "LUX", "MAC",
    "MDG", "MWI", "MYS", "MDV", "MLI", "MLT", "MHL", "MTQ", "MRT", "MUS", "MYT", "MEX",
    "FSM", "MDA", "MCO", "MNG", "MNE", "MSR", "MAR", "MOZ", "MMR", "NAM", "NRU", "NPL",
    "NLD", "NCL", "NZL", "NIC", "NER", "NGA", "NIU", "NFK", "MKD", "MNP", "NOR", "OMN",
    "PAK", "PLW", "PSE", "PAN", "PNG", "PRY", "PER", "PHL", "PCN", "POL", "PRT", "PRI",
    "QAT", "REU", "ROU", "RUS", "RWA", "BLM", "SHN", "KNA", "LCA", "MAF", "SPM", "VCT",
    "WSM", "SMR", "STP", "SAU", "SEN", "SRB", "SYC", "SLE", "SGP", "SXM", "SVK", "SVN",
    "SLB", "SOM", "ZAF", "SGS", "SSD", "ESP", "LKA", "SDN", "SUR", "SJM", "SWE", "CHE",
    "SYR", "TWN", "TJK", "TZA", "THA", "TLS", "TGO", "TKL", "TON", "TTO", "TUN", "TUR",
    "TKM", "TCA", "TUV", "UGA", "UKR", "ARE", "GBR", "USA", "UMI", "URY", "UZB", "VUT",
    "VEN", "VNM", "VGB", "VIR", "WLF", "ESH", "YEM", "ZMB", "ZWE",
];

/// Exact, case-sensitive match against the alpha-3 list
pub fn is_iso_country(code: &str) -> bool {
    ISO_COUNTRIES.contains(&code)
}

/// Check a join request and turn it into a player with a fresh join id
pub fn validate_join_request(request: JoinLobbyRequest) -> Result<Player, MatchmakingError> {
    if request.player_id.is_empty() {
        return Err(MatchmakingError::InvalidJoinRequest {
            reason: "player_id is required".to_string(),
        });
    }

    let level = Level::try_from(request.level)
        .ok()
        .filter(|level| (MIN_LEVEL..=MAX_LEVEL).contains(level))
        .ok_or_else(|| MatchmakingError::InvalidJoinRequest {
            reason: format!(
                "level must be between {} and {} (got {})",
                MIN_LEVEL, MAX_LEVEL, request.level
            ),
        })?;

    if !is_iso_country(&request.country) {
        return Err(MatchmakingError::InvalidJoinRequest {
            reason: format!(
                "country must be an ISO 3166-1 alpha-3 code (got '{}')",
                request.country
            ),
        });
    }

    Ok(Player::new(request.player_id, level, request.country))
}

/// Parse the `join_id` query value
pub fn parse_join_id(value: &str) -> Result<JoinId, MatchmakingError> {
    Uuid::parse_str(value).map_err(|_| MatchmakingError::InvalidJoinId {
        value: value.to_string(),
    })
}

/// Parse the `match_id` query value
pub fn parse_match_id(value: &str) -> Result<MatchId, MatchmakingError> {
    Uuid::parse_str(value).map_err(|_| MatchmakingError::InvalidMatchId {
        value: value.to_string(),
    })
}
