use crate::access::LocationAccessType;

pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const PACKAGE: &str = "📦";
    pub const PHONE: &str = "📱";
    pub const PIN: &str = "📍";
    pub const TARGET: &str = "🎯";
    pub const AREA: &str = "🗺️";
    pub const NONE: &str = "⭕";
}

/// Marker shown next to a classification
pub fn access_icon(access_type: LocationAccessType) -> &'static str {
    match access_type {
        LocationAccessType::NoLocation => Icons::NONE,
        LocationAccessType::FixedLocation => Icons::PIN,
        LocationAccessType::CoarseLocation => Icons::AREA,
        LocationAccessType::FineLocation => Icons::TARGET,
    }
}
