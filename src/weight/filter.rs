// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.


use crate::weight::error::ScaleError;
use crate::weight::interface::StrainGaugeInterface;
use heapless::Vec;
use log::{trace, warn};

pub const MAX_SAMPLES: usize = 64;
const TIMEOUTS_BEFORE_RESET: usize = 3;

/// Raw readings gathered for one averaging operation. Failed frames are simply absent.
pub type SampleSet = Vec<i32, MAX_SAMPLES>;

/// Sorts `samples` and averages what is left after dropping a fifth of the set from each end.
/// Sets of fewer than three readings are averaged untrimmed.
pub fn trimmed_mean(samples: &mut [i32]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();

    let trim = if samples.len() >= 3 {
        samples.len() / 5
    } else {
        0
    };
    let kept = &samples[trim..samples.len() - trim];
    let sum: i64 = kept.iter().map(|&v| v as i64).sum();
    Some(sum as f64 / kept.len() as f64)
}

/// Collects up to `samples` frames and reduces them to a trimmed mean. Individual frame
/// failures are skipped, a run of timeouts power cycles the gauge before carrying on.
pub async fn read_average<G>(gauge: &mut G, samples: usize) -> Result<f64, ScaleError>
where
    G: StrainGaugeInterface,
{
    let requested = if samples > MAX_SAMPLES {
        warn!("Requested {} samples, limiting to {}", samples, MAX_SAMPLES);
        MAX_SAMPLES
    } else {
        samples
    };

    let mut sample_set = SampleSet::new();
    let mut consecutive_timeouts = 0;
    let mut last_error = None;

    for _ in 0..requested {
        match gauge.get_next_reading().await {
            Ok(reading) => {
                consecutive_timeouts = 0;
                if sample_set.push(reading).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Error reading sample: {}", e);
                last_error = Some(e);
                if !e.is_timeout() {
                    continue;
                }
                consecutive_timeouts += 1;
                if consecutive_timeouts >= TIMEOUTS_BEFORE_RESET {
                    warn!("{} consecutive timeouts, resetting strain gauge", consecutive_timeouts);
                    if let Err(e) = gauge.reset().await {
                        warn!("Strain gauge reset failed: {}", e);
                    }
                    consecutive_timeouts = 0;
                }
            }
        }
    }

    trace!("Collected {} of {} samples", sample_set.len(), requested);
    trimmed_mean(&mut sample_set).ok_or(ScaleError::NoValidReading {
        requested,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::error::TransportError;
    use embassy_futures::block_on;
    use embassy_time::Duration;
    use std::collections::VecDeque;

    /// Hands out scripted results frame by frame.
    struct ScriptedGauge {
        script: VecDeque<Result<i32, TransportError>>,
        resets: usize,
    }

    impl ScriptedGauge {
        fn new(script: impl IntoIterator<Item = Result<i32, TransportError>>) -> Self {
            Self {
                script: script.into_iter().collect(),
                resets: 0,
            }
        }
    }

    const TIMEOUT: TransportError = TransportError::Timeout { timeout_ms: 1000 };

    impl StrainGaugeInterface for ScriptedGauge {
        async fn initialize(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn wait_ready(&mut self, _timeout: Duration) -> Result<(), TransportError> {
            Ok(())
        }

        async fn get_next_reading(&mut self) -> Result<i32, TransportError> {
            self.script.pop_front().unwrap_or(Err(TIMEOUT))
        }

        async fn power_down(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn power_up(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn reset(&mut self) -> Result<(), TransportError> {
            self.resets += 1;
            Ok(())
        }
    }

    #[test]
    fn trims_a_fifth_from_each_tail() {
        // ten samples, two dropped from each end
        let mut samples = [1000, -50_000, 1002, 998, 1001, 999, 90_000, 1000, 80_000, -40_000];
        assert_eq!(trimmed_mean(&mut samples), Some(1000.0));
    }

    #[test]
    fn five_samples_drop_one_from_each_end() {
        let mut samples = [10, 20, 30, 40, 1000];
        assert_eq!(trimmed_mean(&mut samples), Some(30.0));
    }

    #[test]
    fn three_and_four_samples_are_not_trimmed() {
        let mut three = [1, 2, 9];
        assert_eq!(trimmed_mean(&mut three), Some(4.0));
        let mut four = [1, 2, 3, 10];
        assert_eq!(trimmed_mean(&mut four), Some(4.0));
    }

    #[test]
    fn small_sets_use_every_value() {
        let mut two = [-3, 4];
        assert_eq!(trimmed_mean(&mut two), Some(0.5));
        let mut one = [7];
        assert_eq!(trimmed_mean(&mut one), Some(7.0));
    }

    #[test]
    fn empty_set_has_no_mean() {
        assert_eq!(trimmed_mean(&mut []), None);
    }

    #[test]
    fn mean_is_not_rounded() {
        let mut samples = [1, 2];
        assert_eq!(trimmed_mean(&mut samples), Some(1.5));
        let mut extreme = [8_388_607, 8_388_607, 8_388_606];
        let mean = trimmed_mean(&mut extreme).unwrap();
        assert!((mean - 8_388_606.666_666_7).abs() < 1e-6);
    }

    #[test]
    fn skips_failed_frames() {
        let mut gauge = ScriptedGauge::new([
            Ok(100),
            Err(TransportError::DataPin(embedded_hal::digital::ErrorKind::Other)),
            Ok(102),
            Err(TIMEOUT),
            Ok(104),
        ]);
        let average = block_on(read_average(&mut gauge, 5)).unwrap();
        // three survivors, trim of 3 / 5 = 0
        assert_eq!(average, 102.0);
    }

    #[test]
    fn all_frames_failing_is_no_valid_reading() {
        let mut gauge = ScriptedGauge::new([Err(TIMEOUT), Err(TIMEOUT)]);
        let result = block_on(read_average(&mut gauge, 2));
        match result {
            Err(ScaleError::NoValidReading {
                requested,
                last_error,
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(last_error, Some(TIMEOUT));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn zero_samples_is_no_valid_reading() {
        let mut gauge = ScriptedGauge::new([Ok(1)]);
        assert!(matches!(
            block_on(read_average(&mut gauge, 0)),
            Err(ScaleError::NoValidReading { requested: 0, .. })
        ));
    }

    #[test]
    fn repeated_timeouts_reset_the_gauge() {
        let mut gauge = ScriptedGauge::new([Err(TIMEOUT), Err(TIMEOUT), Err(TIMEOUT), Ok(55)]);
        let average = block_on(read_average(&mut gauge, 4)).unwrap();
        assert_eq!(average, 55.0);
        assert_eq!(gauge.resets, 1);
    }

    #[test]
    fn oversized_requests_are_clamped() {
        let mut gauge = ScriptedGauge::new((0..100).map(|_| Ok(5)));
        block_on(read_average(&mut gauge, 100)).unwrap();
        assert_eq!(gauge.script.len(), 100 - MAX_SAMPLES);
    }
}
