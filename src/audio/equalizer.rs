use std::{fmt, str::FromStr};
use tracing::info;

use crate::error::{PlayerError, Result};

/// Número de bandas del ecualizador
pub const BAND_COUNT: usize = 15;

/// Frecuencias centrales (Hz); la banda `i + 1` corresponde a `HZ_BANDS[i]`
pub const HZ_BANDS: [u32; BAND_COUNT] = [
    20, 40, 63, 100, 150, 250, 400, 450, 630, 1000, 1600, 2500, 4000, 10000, 16000,
];

/// Ganancia máxima aceptada por banda, en dB
pub const MAX_GAIN_DB: f32 = 10.0;

/// Vector de ganancias tal como lo recibe el transporte (`-1.0..=1.0`)
pub type Bands = [f32; BAND_COUNT];

/// Presets predefinidos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqPreset {
    Flat,
    Boost,
    Metal,
    Piano,
}

impl EqPreset {
    pub const ALL: [EqPreset; 4] = [Self::Flat, Self::Boost, Self::Metal, Self::Piano];

    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Boost => "boost",
            Self::Metal => "metal",
            Self::Piano => "piano",
        }
    }

    /// Lista todos los presets disponibles
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|preset| preset.name()).collect()
    }

    pub fn gains(self) -> Bands {
        match self {
            Self::Flat => [0.0; BAND_COUNT],
            Self::Boost => [
                -0.075, 0.125, 0.125, 0.1, 0.1, 0.05, 0.075, 0.0, 0.0, 0.0, 0.0, 0.0, 0.125, 0.15, 0.05,
            ],
            Self::Metal => [
                0.0, 0.1, 0.1, 0.15, 0.13, 0.1, 0.0, 0.125, 0.175, 0.175, 0.125, 0.125, 0.1, 0.075, 0.0,
            ],
            Self::Piano => [
                -0.25, -0.25, -0.125, 0.0, 0.25, 0.25, 0.0, -0.25, -0.25, 0.0, 0.0, 0.5, 0.25, -0.025, 0.0,
            ],
        }
    }
}

impl FromStr for EqPreset {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PlayerError::InvalidEqPreset(s.to_string()))
    }
}

impl fmt::Display for EqPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resuelve una banda: índice `1..=15` o una de las frecuencias de `HZ_BANDS`.
/// Devuelve el índice interno (base 0).
pub fn resolve_band(selector: u32) -> Result<usize> {
    if (1..=BAND_COUNT as u32).contains(&selector) {
        return Ok(selector as usize - 1);
    }

    HZ_BANDS
        .iter()
        .position(|&hz| hz == selector)
        .ok_or(PlayerError::NonExistentEqBand(selector))
}

/// Estado del ecualizador de 15 bandas de una sesión
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerState {
    bands: Bands,
}

impl Default for EqualizerState {
    fn default() -> Self {
        Self {
            bands: EqPreset::Flat.gains(),
        }
    }
}

impl EqualizerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bands(&self) -> Bands {
        self.bands
    }

    /// Aplica un preset y devuelve el vector completo
    pub fn apply_preset(&mut self, name: &str) -> Result<(EqPreset, Bands)> {
        let preset: EqPreset = name.parse()?;
        self.bands = preset.gains();
        info!("🎛️ Preset '{}' aplicado", preset);
        Ok((preset, self.bands))
    }

    /// Ajusta una banda (ganancia en dB) y devuelve el vector completo
    pub fn set_band(&mut self, selector: u32, gain_db: f32) -> Result<Bands> {
        let index = resolve_band(selector)?;

        if !gain_db.is_finite() || gain_db.abs() > MAX_GAIN_DB {
            return Err(PlayerError::EqGainOutOfBounds(gain_db));
        }

        self.bands[index] = gain_db / MAX_GAIN_DB;
        info!(
            "🎛️ Banda {} ({} Hz) ajustada a {} dB",
            index + 1,
            HZ_BANDS[index],
            gain_db
        );
        Ok(self.bands)
    }

    /// Resetea a valores por defecto
    pub fn reset(&mut self) {
        self.bands = EqPreset::Flat.gains();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_preset_has_fifteen_bands_in_range() {
        for preset in EqPreset::ALL {
            let gains = preset.gains();
            assert_eq!(gains.len(), BAND_COUNT);
            assert!(gains.iter().all(|g| (-1.0..=1.0).contains(g)), "{preset}");
        }
    }

    #[test]
    fn preset_names_are_case_insensitive() {
        let mut eq = EqualizerState::new();
        let (preset, bands) = eq.apply_preset("Metal").unwrap();
        assert_eq!(preset, EqPreset::Metal);
        assert_eq!(bands, EqPreset::Metal.gains());
        assert_eq!(eq.bands(), EqPreset::Metal.gains());
    }

    #[test]
    fn unknown_preset_leaves_bands_untouched() {
        let mut eq = EqualizerState::new();
        eq.apply_preset("boost").unwrap();
        assert_eq!(
            eq.apply_preset("jazz"),
            Err(PlayerError::InvalidEqPreset("jazz".into()))
        );
        assert_eq!(eq.bands(), EqPreset::Boost.gains());
        assert_eq!(EqPreset::names(), vec!["flat", "boost", "metal", "piano"]);
    }

    #[test]
    fn band_selector_accepts_index_or_frequency() {
        assert_eq!(resolve_band(1), Ok(0));
        assert_eq!(resolve_band(15), Ok(14));
        assert_eq!(resolve_band(20), Ok(0));
        assert_eq!(resolve_band(1000), Ok(9));
        assert_eq!(resolve_band(16000), Ok(14));
        assert_eq!(resolve_band(0), Err(PlayerError::NonExistentEqBand(0)));
        assert_eq!(resolve_band(16), Err(PlayerError::NonExistentEqBand(16)));
        assert_eq!(resolve_band(999), Err(PlayerError::NonExistentEqBand(999)));
    }

    #[test]
    fn set_band_scales_gain() {
        let mut eq = EqualizerState::new();
        let bands = eq.set_band(1000, 5.0).unwrap();
        // 1000 Hz es la banda 10 de la tabla
        assert_eq!(bands[9], 0.5);
        assert_eq!(bands.iter().filter(|g| **g != 0.0).count(), 1);

        let bands = eq.set_band(1, -10.0).unwrap();
        assert_eq!(bands[0], -1.0);
    }

    #[test]
    fn set_band_rejects_bad_band_before_gain() {
        let mut eq = EqualizerState::new();
        assert_eq!(eq.set_band(16, 0.0), Err(PlayerError::NonExistentEqBand(16)));
        assert_eq!(eq.set_band(16, 50.0), Err(PlayerError::NonExistentEqBand(16)));
        assert_eq!(eq.set_band(1, 11.0), Err(PlayerError::EqGainOutOfBounds(11.0)));
        assert!(eq.set_band(1, f32::NAN).is_err());
        assert_eq!(eq, EqualizerState::new());
    }
}
