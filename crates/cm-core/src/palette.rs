use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PALETTE;
use crate::error::ConfigError;
use crate::record::Family;

/// Ordered, non-empty list of color keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self, ConfigError> {
        if colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Color at `slot`, wrapping around the palette.
    pub fn get(&self, slot: usize) -> &str {
        &self.colors[slot % self.colors.len()]
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for Palette {
    type Error = ConfigError;

    fn try_from(colors: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(colors)
    }
}

impl From<Palette> for Vec<String> {
    fn from(palette: Palette) -> Self {
        palette.colors
    }
}

/// Lazily assigns one color per `(family, cluster)` for the lifetime of a run.
///
/// A single counter is shared by all families, so the first trigger cluster
/// and the first thought cluster receive different slots. Once a pair has a
/// color it never changes.
#[derive(Debug)]
pub struct ColorRegistry {
    palette: Palette,
    assigned: HashMap<(Family, usize), usize>,
    next_slot: usize,
}

impl ColorRegistry {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            assigned: HashMap::new(),
            next_slot: 0,
        }
    }

    pub fn color_for(&mut self, family: Family, cluster: usize) -> String {
        let slot = match self.assigned.get(&(family, cluster)) {
            Some(&slot) => slot,
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.assigned.insert((family, cluster), slot);
                slot
            }
        };
        self.palette.get(slot).to_string()
    }

    /// Color already given to `(family, cluster)`, without assigning one.
    pub fn assigned(&self, family: Family, cluster: usize) -> Option<&str> {
        self.assigned
            .get(&(family, cluster))
            .map(|&slot| self.palette.get(slot))
    }

    /// Number of `(family, cluster)` pairs that have a color.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_palette_rejected() {
        assert_eq!(Palette::new(Vec::new()), Err(ConfigError::EmptyPalette));
    }

    #[test]
    fn test_default_palette_has_eight_colors() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 8);
        assert_eq!(palette.get(0), "#ff7f7f");
        assert_eq!(palette.get(8), "#ff7f7f");
    }

    #[test]
    fn test_memoized_per_pair() {
        let mut registry = ColorRegistry::new(Palette::default());
        let first = registry.color_for(Family::Trigger, 0);
        let again = registry.color_for(Family::Trigger, 0);
        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.assigned(Family::Trigger, 0), Some(first.as_str()));
        assert_eq!(registry.assigned(Family::Thought, 0), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_counter_shared_across_families() {
        let mut registry = ColorRegistry::new(Palette::default());
        let trigger = registry.color_for(Family::Trigger, 0);
        let thought = registry.color_for(Family::Thought, 0);
        assert_eq!(trigger, "#ff7f7f");
        assert_eq!(thought, "#7fbfff");
        assert_eq!(registry.color_for(Family::Trigger, 0), trigger);
        assert_eq!(registry.color_for(Family::Thought, 0), thought);
    }

    #[test]
    fn test_wraps_after_palette_exhausted() {
        let palette = Palette::new(vec!["red".into(), "blue".into()]).unwrap();
        let mut registry = ColorRegistry::new(palette);
        let colors: Vec<String> = (0..5)
            .map(|c| registry.color_for(Family::Response, c))
            .collect();
        assert_eq!(colors, vec!["red", "blue", "red", "blue", "red"]);
        // Earlier assignments are not reshuffled by later ones.
        assert_eq!(registry.color_for(Family::Response, 1), "blue");
    }

    #[test]
    fn test_palette_serde() {
        let palette: Palette = serde_json::from_str(r##"["#000", "#fff"]"##).unwrap();
        assert_eq!(palette.len(), 2);
        assert!(serde_json::from_str::<Palette>("[]").is_err());
    }
}
