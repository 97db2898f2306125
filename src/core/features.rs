//! Time-domain EMG feature extraction.
//!
//! Each full window yields six statistics per channel. The output vector is
//! channel-major: all six values for channel 0, then channel 1, and so on.
//! The standardization parameters shipped with the model use the same
//! layout, so the order here must never change.

use crate::core::windowing::Window;
use crate::source::types::CHANNEL_COUNT;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Statistics computed per channel.
pub const FEATURES_PER_CHANNEL: usize = 6;

/// Length of the feature vector fed to the classifier.
pub const NUM_FEATURES: usize = FEATURES_PER_CHANNEL * CHANNEL_COUNT;

/// A per-channel statistic, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Mean absolute value
    Mav = 0,
    /// Waveform length
    Wl = 1,
    /// Zero crossings
    Zc = 2,
    /// Slope sign changes
    Ssc = 3,
    /// Root mean square
    Rms = 4,
    /// Sample standard deviation
    Std = 5,
}

impl Feature {
    /// All statistics in emission order.
    pub const ALL: [Feature; FEATURES_PER_CHANNEL] = [
        Feature::Mav,
        Feature::Wl,
        Feature::Zc,
        Feature::Ssc,
        Feature::Rms,
        Feature::Std,
    ];

    /// Position of this statistic for `channel` in the feature vector.
    pub fn index(self, channel: usize) -> usize {
        channel * FEATURES_PER_CHANNEL + self as usize
    }
}

/// The six statistics of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelFeatures {
    pub mav: f64,
    pub wl: f64,
    pub zc: f64,
    pub ssc: f64,
    pub rms: f64,
    pub std: f64,
}

impl ChannelFeatures {
    /// Compute all statistics for one channel's time series.
    pub fn compute(signal: &[f64]) -> Self {
        Self {
            mav: mean_absolute_value(signal),
            wl: waveform_length(signal),
            zc: zero_crossings(signal) as f64,
            ssc: slope_sign_changes(signal) as f64,
            rms: root_mean_square(signal),
            std: standard_deviation(signal),
        }
    }

    /// Values in emission order.
    pub fn to_array(&self) -> [f64; FEATURES_PER_CHANNEL] {
        [self.mav, self.wl, self.zc, self.ssc, self.rms, self.std]
    }
}

/// Flattened feature vector of length [`NUM_FEATURES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    /// Wrap raw values. Returns `None` unless exactly [`NUM_FEATURES`] long.
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        (values.len() == NUM_FEATURES).then_some(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }

    /// Value of one statistic for one channel.
    pub fn get(&self, channel: usize, feature: Feature) -> f64 {
        self.values[feature.index(channel)]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute the feature vector for a window.
pub fn extract_features(window: &Window) -> FeatureVector {
    let mut values = Vec::with_capacity(NUM_FEATURES);
    for channel in 0..CHANNEL_COUNT {
        let signal = window.channel(channel);
        values.extend_from_slice(&ChannelFeatures::compute(&signal).to_array());
    }
    FeatureVector { values }
}

/// Mean of absolute values.
pub fn mean_absolute_value(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|x| x.abs()).mean()
}

/// Sum of absolute first differences.
pub fn waveform_length(signal: &[f64]) -> f64 {
    signal.windows(2).map(|w| (w[1] - w[0]).abs()).sum()
}

/// Adjacent pairs with strictly opposite signs.
///
/// A sample sitting exactly on zero never completes a crossing.
pub fn zero_crossings(signal: &[f64]) -> usize {
    signal.windows(2).filter(|w| w[0] * w[1] < 0.0).count()
}

/// Interior points where the first difference changes sign.
pub fn slope_sign_changes(signal: &[f64]) -> usize {
    signal
        .windows(3)
        .filter(|w| (w[1] - w[0]) * (w[2] - w[1]) < 0.0)
        .count()
}

/// Root mean square.
pub fn root_mean_square(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().quadratic_mean()
}

/// Sample standard deviation (n - 1 divisor).
pub fn standard_deviation(signal: &[f64]) -> f64 {
    if signal.len() < 2 {
        return 0.0;
    }
    signal.iter().std_dev()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::windowing::WINDOW_SIZE;

    #[test]
    fn test_zero_window_all_features_zero() {
        let window = Window::from_readings(&[[0; CHANNEL_COUNT]; WINDOW_SIZE]);
        let features = extract_features(&window);

        assert_eq!(features.len(), NUM_FEATURES);
        assert!(features.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_channel_major_ordering() {
        // Channel c holds the constant value c + 1, so MAV and RMS equal
        // c + 1 while every other statistic is zero.
        let mut reading = [0; CHANNEL_COUNT];
        for (c, value) in reading.iter_mut().enumerate() {
            *value = c as i32 + 1;
        }
        let window = Window::from_readings(&[reading; WINDOW_SIZE]);
        let features = extract_features(&window);

        for c in 0..CHANNEL_COUNT {
            let base = c * FEATURES_PER_CHANNEL;
            let expected = (c + 1) as f64;
            assert!((features.as_slice()[base] - expected).abs() < 1e-12);
            assert_eq!(features.as_slice()[base + 1], 0.0);
            assert_eq!(features.as_slice()[base + 2], 0.0);
            assert_eq!(features.as_slice()[base + 3], 0.0);
            assert!((features.as_slice()[base + 4] - expected).abs() < 1e-12);
            assert!(features.as_slice()[base + 5].abs() < 1e-12);
        }
    }

    #[test]
    fn test_feature_index_layout() {
        assert_eq!(Feature::Mav.index(0), 0);
        assert_eq!(Feature::Std.index(0), 5);
        assert_eq!(Feature::Mav.index(1), 6);
        assert_eq!(Feature::Std.index(7), NUM_FEATURES - 1);
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(3), 3 * FEATURES_PER_CHANNEL + i);
        }
    }

    #[test]
    fn test_single_channel_lands_in_its_slot() {
        let mut readings = [[0; CHANNEL_COUNT]; WINDOW_SIZE];
        for (i, reading) in readings.iter_mut().enumerate() {
            reading[5] = if i % 2 == 0 { 10 } else { -10 };
        }
        let features = extract_features(&Window::from_readings(&readings));

        assert_eq!(features.get(5, Feature::Zc), (WINDOW_SIZE - 1) as f64);
        assert_eq!(features.get(5, Feature::Ssc), (WINDOW_SIZE - 2) as f64);
        assert_eq!(features.get(5, Feature::Wl), 20.0 * (WINDOW_SIZE - 1) as f64);
        assert_eq!(features.get(5, Feature::Mav), 10.0);
        for c in (0..CHANNEL_COUNT).filter(|&c| c != 5) {
            for feature in Feature::ALL {
                assert_eq!(features.get(c, feature), 0.0);
            }
        }
    }

    #[test]
    fn test_touching_zero_is_not_a_crossing() {
        assert_eq!(zero_crossings(&[1.0, 0.0, -1.0]), 0);
        assert_eq!(zero_crossings(&[1.0, -1.0]), 1);
        assert_eq!(zero_crossings(&[-3.0, 2.0, 0.0, 4.0, -1.0]), 2);
    }

    #[test]
    fn test_standard_deviation_uses_bessel_correction() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = standard_deviation(&values);
        assert!((sd - 2.1381).abs() < 1e-4);
    }

    #[test]
    fn test_standard_deviation_of_constant_is_zero() {
        assert_eq!(standard_deviation(&[3.0; WINDOW_SIZE]), 0.0);
        assert_eq!(standard_deviation(&[3.0]), 0.0);
    }

    #[test]
    fn test_waveform_length_and_slope_changes() {
        let signal = [0.0, 2.0, 1.0, 3.0, 3.0, 0.0];
        assert_eq!(waveform_length(&signal), 2.0 + 1.0 + 2.0 + 0.0 + 3.0);
        // Flat segment (3 -> 3) breaks the sign change at index 3 and 4
        assert_eq!(slope_sign_changes(&signal), 2);
    }

    #[test]
    fn test_mav_and_rms() {
        let signal = [3.0, -4.0];
        assert_eq!(mean_absolute_value(&signal), 3.5);
        assert!((root_mean_square(&signal) - (12.5f64).sqrt()).abs() < 1e-12);
        assert_eq!(root_mean_square(&[]), 0.0);
    }

    #[test]
    fn test_feature_vector_length_check() {
        assert!(FeatureVector::from_values(vec![0.0; NUM_FEATURES]).is_some());
        assert!(FeatureVector::from_values(vec![0.0; NUM_FEATURES - 1]).is_none());
    }
}
