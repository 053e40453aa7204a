// src/models/settings.rs

use serde::Serialize;
use utoipa::ToSchema;

// O painel só tem o tema claro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct ThemeSettings {
    pub theme: Theme,
}
