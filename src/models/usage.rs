/// Ledger key for the per-day usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiType {
    OutfitGenerate,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::OutfitGenerate => "outfit_generate",
        }
    }
}
