use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use biosense_signals::physio::{HrvConfig, RespirationConfig, RrConfig, StressConfig, VitalsConfig};
use biosense_signals::rppg::{ConditionerConfig, FrequencyConfig, ValidatorConfig};
use biosense_signals::vision::RegionConfig;
use biosense_signals::voice::VoiceConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] VarError),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

/// Full configuration, one section per pipeline component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiosenseConfig {
    pub session: SessionConfig,
    pub region: RegionConfig,
    pub conditioner: ConditionerConfig,
    pub frequency: FrequencyConfig,
    pub validator: ValidatorConfig,
    pub rr: RrConfig,
    pub hrv: HrvConfig,
    pub respiration: RespirationConfig,
    pub vitals: VitalsConfig,
    pub stress: StressConfig,
    pub voice: VoiceConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Evaluation cadence in data time (ms)
    pub evaluation_interval_ms: u64,
    /// Pull audio from the audio source on each tick
    pub audio_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_ms: 1000,
            audio_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Record a trace event per processing step
    pub enabled: bool,
    /// Trace events retained (oldest dropped)
    pub capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 4096,
        }
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(format!("Invalid {key}: {raw:?}")))
}

impl BiosenseConfig {
    /// Load and validate a TOML file. Missing sections and fields take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BiosenseConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    ///
    /// A user file replaces the default file as a whole.
    pub fn load_layered(
        default_path: Option<&Path>,
        user_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = BiosenseConfig::default();

        if let Some(path) = default_path.filter(|p| p.exists()) {
            config = Self::from_file(path)?;
        }
        if let Some(path) = user_path.filter(|p| p.exists()) {
            config = Self::from_file(path)?;
        }

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BIOSENSE_*` environment variable overrides.
    ///
    /// Example: `BIOSENSE_MIN_SNR=2.5`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| match env::var(key) {
            Ok(val) => Ok(Some(val)),
            Err(VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        if let Some(val) = lookup("BIOSENSE_SAMPLE_RATE")? {
            let rate: f32 = parse("BIOSENSE_SAMPLE_RATE", &val)?;
            self.set_sample_rate(rate);
        }
        if let Some(val) = lookup("BIOSENSE_EVALUATION_INTERVAL_MS")? {
            self.session.evaluation_interval_ms = parse("BIOSENSE_EVALUATION_INTERVAL_MS", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_AUDIO_ENABLED")? {
            self.session.audio_enabled = parse("BIOSENSE_AUDIO_ENABLED", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_MIN_QUALITY")? {
            self.conditioner.min_quality = parse("BIOSENSE_MIN_QUALITY", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_MIN_SKIN_FRACTION")? {
            self.region.min_skin_fraction = parse("BIOSENSE_MIN_SKIN_FRACTION", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_MIN_SNR")? {
            self.frequency.min_snr = parse("BIOSENSE_MIN_SNR", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_MAX_CHANGE_BPM")? {
            self.validator.max_change_bpm = parse("BIOSENSE_MAX_CHANGE_BPM", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_RR_SEED")? {
            self.rr.seed = parse("BIOSENSE_RR_SEED", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_VAD_RMS_THRESHOLD")? {
            self.voice.vad.rms_threshold = parse("BIOSENSE_VAD_RMS_THRESHOLD", &val)?;
        }
        if let Some(val) = lookup("BIOSENSE_TRACE")? {
            self.diagnostics.enabled = parse("BIOSENSE_TRACE", &val)?;
        }
        Ok(())
    }

    /// Set the video frame rate on every component that depends on it.
    pub fn set_sample_rate(&mut self, rate: f32) {
        self.conditioner.sample_rate = rate;
        self.respiration.sample_rate = rate;
        self.vitals.sample_rate = rate;
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_session()?;
        self.validate_region()?;
        self.validate_rppg()?;
        self.validate_physio()?;
        self.validate_voice()?;
        Ok(())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.evaluation_interval_ms == 0 {
            return Err(invalid("session.evaluation_interval_ms must be > 0"));
        }
        if self.diagnostics.enabled && self.diagnostics.capacity == 0 {
            return Err(invalid("diagnostics.capacity must be > 0 when enabled"));
        }
        Ok(())
    }

    fn validate_region(&self) -> Result<(), ConfigError> {
        let r = &self.region;
        if r.regions.is_empty() {
            return Err(invalid("region.regions must not be empty"));
        }
        for roi in &r.regions {
            let inside = (0.0..=1.0).contains(&roi.x)
                && (0.0..=1.0).contains(&roi.y)
                && roi.width > 0.0
                && roi.height > 0.0
                && roi.x + roi.width <= 1.0 + f32::EPSILON
                && roi.y + roi.height <= 1.0 + f32::EPSILON;
            if !inside {
                return Err(invalid(format!(
                    "region '{}' must be a non-empty box inside the unit square",
                    roi.name
                )));
            }
            if roi.weight < 0.0 {
                return Err(invalid(format!("region '{}' weight must be >= 0", roi.name)));
            }
        }
        if r.regions.iter().all(|roi| roi.weight <= 0.0) {
            return Err(invalid("region weights must not all be zero"));
        }
        if r.stride == 0 {
            return Err(invalid("region.stride must be > 0"));
        }
        if !(0.0..=1.0).contains(&r.min_skin_fraction) {
            return Err(invalid("region.min_skin_fraction must be in [0, 1]"));
        }
        if r.min_luma >= r.max_luma {
            return Err(invalid("region.min_luma must be < max_luma"));
        }
        Ok(())
    }

    fn validate_rppg(&self) -> Result<(), ConfigError> {
        let c = &self.conditioner;
        if c.sample_rate <= 0.0 {
            return Err(invalid("conditioner.sample_rate must be positive"));
        }
        if c.analysis_window < 8 {
            return Err(invalid("conditioner.analysis_window must be >= 8"));
        }
        if c.window_capacity < c.required_len() {
            return Err(invalid(
                "conditioner.window_capacity must hold twice the analysis window",
            ));
        }
        if !(c.high_pass_hz > 0.0 && c.high_pass_hz < c.low_pass_hz && c.low_pass_hz < c.sample_rate / 2.0)
        {
            return Err(invalid(
                "conditioner band must satisfy 0 < high_pass_hz < low_pass_hz < sample_rate / 2",
            ));
        }
        if !(0.0..=1.0).contains(&c.min_quality) {
            return Err(invalid("conditioner.min_quality must be in [0, 1]"));
        }

        let f = &self.frequency;
        if !f.fft_size.is_power_of_two() {
            return Err(invalid("frequency.fft_size must be a power of two"));
        }
        if f.min_hz >= f.max_hz {
            return Err(invalid("frequency.min_hz must be < max_hz"));
        }
        if f.min_bpm >= f.max_bpm {
            return Err(invalid("frequency.min_bpm must be < max_bpm"));
        }
        if f.min_snr <= 0.0 {
            return Err(invalid("frequency.min_snr must be positive"));
        }
        if f.harmonic_min_ratio < 0.0 || f.harmonic_min_ratio >= f.harmonic_max_ratio {
            return Err(invalid(
                "frequency harmonic ratios must satisfy 0 <= min < max",
            ));
        }

        let v = &self.validator;
        if v.history_len == 0 || v.consistency_window == 0 || v.min_history == 0 {
            return Err(invalid("validator lengths must be > 0"));
        }
        if v.consistency_window > v.history_len {
            return Err(invalid("validator.consistency_window must be <= history_len"));
        }
        if v.max_deviation <= 0.0 || v.max_deviation > 1.0 {
            return Err(invalid("validator.max_deviation must be in (0, 1]"));
        }
        if v.ema_alpha <= 0.0 || v.ema_alpha > 1.0 {
            return Err(invalid("validator.ema_alpha must be in (0, 1]"));
        }
        if v.max_change_bpm < 1.0 {
            return Err(invalid("validator.max_change_bpm must be >= 1"));
        }
        Ok(())
    }

    fn validate_physio(&self) -> Result<(), ConfigError> {
        let rr = &self.rr;
        if rr.capacity == 0 {
            return Err(invalid("rr.capacity must be > 0"));
        }
        if rr.min_rr_ms <= 0.0 || rr.min_rr_ms >= rr.max_rr_ms {
            return Err(invalid("rr.min_rr_ms must be in (0, max_rr_ms)"));
        }
        if rr.jitter_fraction < 0.0 || rr.rsa_fraction < 0.0 {
            return Err(invalid("rr jitter and rsa fractions must be >= 0"));
        }

        let h = &self.hrv;
        let ordered = h.vlf_band.0 < h.vlf_band.1
            && h.vlf_band.1 <= h.lf_band.0
            && h.lf_band.0 < h.lf_band.1
            && h.lf_band.1 <= h.hf_band.0
            && h.hf_band.0 < h.hf_band.1;
        if !ordered {
            return Err(invalid("hrv bands must be ordered VLF < LF < HF"));
        }
        if h.resample_hz <= 2.0 * h.hf_band.1 {
            return Err(invalid("hrv.resample_hz must exceed twice the HF upper edge"));
        }
        if h.fft_size == 0 || h.histogram_bin_ms <= 0.0 || h.entropy_r <= 0.0 {
            return Err(invalid(
                "hrv.fft_size, histogram_bin_ms and entropy_r must be positive",
            ));
        }
        if h.dfa_short.min < 4 || h.dfa_short.min > h.dfa_short.max || h.dfa_long.min > h.dfa_long.max {
            return Err(invalid("hrv DFA scales must satisfy 4 <= min <= max"));
        }

        let r = &self.respiration;
        if r.min_freq >= r.max_freq || r.min_rate >= r.max_rate {
            return Err(invalid("respiration band and rate range must be ordered"));
        }

        let v = &self.vitals;
        if v.spo2_min >= v.spo2_max {
            return Err(invalid("vitals.spo2_min must be < spo2_max"));
        }
        if v.systolic_range.0 >= v.systolic_range.1 || v.diastolic_range.0 >= v.diastolic_range.1 {
            return Err(invalid("vitals blood pressure ranges must be ordered"));
        }
        if v.diastolic_range.1 >= v.systolic_range.1 {
            return Err(invalid("vitals diastolic range must sit below systolic range"));
        }
        if v.perfusion_min <= 0.0 || v.perfusion_min >= v.perfusion_max {
            return Err(invalid("vitals perfusion range must satisfy 0 < min < max"));
        }

        let s = &self.stress;
        let weights = [s.hr_weight, s.rmssd_weight, s.sdnn_weight, s.lf_hf_weight, s.vocal_weight];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f32>() <= 0.0 {
            return Err(invalid("stress weights must be >= 0 with a positive sum"));
        }
        if s.level_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("stress.level_thresholds must be strictly ascending"));
        }

        let rates = [self.conditioner.sample_rate, r.sample_rate, v.sample_rate];
        if rates.iter().any(|rate| (rate - rates[0]).abs() > f32::EPSILON) {
            return Err(invalid(
                "conditioner, respiration and vitals sample_rate must match",
            ));
        }
        Ok(())
    }

    fn validate_voice(&self) -> Result<(), ConfigError> {
        let v = &self.voice;
        if v.vad.rms_threshold <= 0.0 || v.vad.zcr_threshold <= 0.0 {
            return Err(invalid("voice.vad thresholds must be positive"));
        }
        if v.pitch.min_f0 <= 0.0 || v.pitch.min_f0 >= v.pitch.max_f0 {
            return Err(invalid("voice.pitch must satisfy 0 < min_f0 < max_f0"));
        }
        if v.pitch.history_len == 0 {
            return Err(invalid("voice.pitch.history_len must be > 0"));
        }
        if v.analysis_frame_ms <= 0.0 || v.buffer_seconds * 1000.0 < v.analysis_frame_ms {
            return Err(invalid(
                "voice.buffer_seconds must hold at least one analysis frame",
            ));
        }
        if v.breathing.envelope_hop_ms <= 0.0 || v.breathing.min_seconds > v.breathing.envelope_seconds {
            return Err(invalid("voice.breathing envelope settings are inconsistent"));
        }
        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| invalid(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| Ok(map.get(key).cloned())
    }

    #[test]
    fn test_default_config_valid() {
        assert!(BiosenseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_bounds() {
        let config = BiosenseConfig::default();
        assert_eq!(config.frequency.min_bpm, 45);
        assert_eq!(config.frequency.max_bpm, 200);
        assert_eq!(config.respiration.min_rate, 8.0);
        assert_eq!(config.respiration.max_rate, 40.0);
        assert_eq!(config.vitals.spo2_min, 85.0);
        assert_eq!(config.vitals.spo2_max, 100.0);
        assert_eq!(config.validator.max_change_bpm, 15.0);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = BiosenseConfig::default();
        config.frequency.min_hz = 4.0;
        assert!(config.validate().is_err());

        let mut config = BiosenseConfig::default();
        config.conditioner.window_capacity = 100;
        assert!(config.validate().is_err());

        let mut config = BiosenseConfig::default();
        config.hrv.lf_band = (0.2, 0.1);
        assert!(config.validate().is_err());

        let mut config = BiosenseConfig::default();
        config.stress.level_thresholds = [20.0, 60.0, 40.0, 80.0];
        assert!(config.validate().is_err());

        let mut config = BiosenseConfig::default();
        config.region.regions.clear();
        assert!(config.validate().is_err());

        let mut config = BiosenseConfig::default();
        config.vitals.sample_rate = 25.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sample_rate"), "{err}");
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let mut config = BiosenseConfig::default();
        config.frequency.min_snr = 2.5;
        config.diagnostics.enabled = true;

        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();
        let loaded = BiosenseConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [session]
            evaluation_interval_ms = 500

            [validator]
            max_change_bpm = 10.0
        "#;
        let config = BiosenseConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.session.evaluation_interval_ms, 500);
        assert_eq!(config.validator.max_change_bpm, 10.0);
        assert_eq!(config.validator.history_len, 10);
        assert_eq!(config.region, RegionConfig::default());
    }

    #[test]
    fn test_invalid_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nevaluation_interval_ms = 0").unwrap();
        assert!(matches!(
            BiosenseConfig::from_file(file.path()),
            Err(ConfigError::Validation(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[session\nbroken").unwrap();
        assert!(matches!(
            BiosenseConfig::from_file(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_load_layered_prefers_user_file() {
        let mut default_file = NamedTempFile::new().unwrap();
        writeln!(default_file, "[session]\nevaluation_interval_ms = 2000").unwrap();
        let mut user_file = NamedTempFile::new().unwrap();
        writeln!(user_file, "[session]\nevaluation_interval_ms = 750").unwrap();

        let config =
            BiosenseConfig::load_layered(Some(default_file.path()), Some(user_file.path())).unwrap();
        assert_eq!(config.session.evaluation_interval_ms, 750);

        let missing = Path::new("/nonexistent/biosense.toml");
        let config = BiosenseConfig::load_layered(Some(default_file.path()), Some(missing)).unwrap();
        assert_eq!(config.session.evaluation_interval_ms, 2000);
    }

    #[test]
    fn test_overrides() {
        let mut config = BiosenseConfig::default();
        config
            .apply_overrides(lookup(&[
                ("BIOSENSE_SAMPLE_RATE", "25"),
                ("BIOSENSE_MIN_SNR", "3.5"),
                ("BIOSENSE_TRACE", "true"),
            ]))
            .unwrap();
        assert_eq!(config.conditioner.sample_rate, 25.0);
        assert_eq!(config.vitals.sample_rate, 25.0);
        assert_eq!(config.frequency.min_snr, 3.5);
        assert!(config.diagnostics.enabled);
        assert!(config.validate().is_ok());

        let err = config
            .apply_overrides(lookup(&[("BIOSENSE_RR_SEED", "abc")]))
            .unwrap_err();
        assert!(err.to_string().contains("BIOSENSE_RR_SEED"));
    }
}
