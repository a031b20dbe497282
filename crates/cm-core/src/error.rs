use std::fmt;

/// Fatal configuration problems. Raised before any clustering starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidEps(f64),
    InvalidMinPts(usize),
    EmptyPalette,
    InvalidCanvasHeight(f64),
    InvalidSpacing(f64),
    InvalidColumn { family: &'static str, x: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEps(eps) => {
                write!(f, "eps must be a positive finite number, got {eps}")
            }
            ConfigError::InvalidMinPts(n) => write!(f, "min_pts must be at least 1, got {n}"),
            ConfigError::EmptyPalette => write!(f, "palette must contain at least one color"),
            ConfigError::InvalidCanvasHeight(h) => {
                write!(f, "canvas height must be a positive finite number, got {h}")
            }
            ConfigError::InvalidSpacing(s) => {
                write!(f, "node spacing must be a positive finite number, got {s}")
            }
            ConfigError::InvalidColumn { family, x } => {
                write!(f, "{family} column must be a finite number, got {x}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
