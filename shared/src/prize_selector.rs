//! Weighted-random outcome selection for the wheel.
//!
//! Both selectors are pure given their random source, so callers decide
//! whether to draw from an OS-seeded generator or a fixed seed.

use rand::Rng;

use crate::constants::WIN_INDEX;
use crate::shared_wheel_game::{GameConfig, GameMode, PrizeOption};

/// Winning segment and the label shown for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub label: String,
}

/// Mode 1: picks an option with probability proportional to its weight.
///
/// Returns `None` when there is nothing to draw from (no options, or the
/// weights sum to zero). A validated config never hits that case.
pub fn select_weighted<R: Rng + ?Sized>(options: &[PrizeOption], rng: &mut R) -> Option<Selection> {
    let mut total = 0.0;
    let cumulative: Vec<f64> = options
        .iter()
        .map(|option| {
            total += option.probability;
            total
        })
        .collect();

    if options.is_empty() || total <= 0.0 {
        return None;
    }

    let draw = rng.gen_range(0.0..total);
    // Ties go to the earlier segment.
    let index = cumulative
        .iter()
        .position(|&threshold| draw <= threshold)
        .unwrap_or(options.len() - 1);

    Some(Selection {
        index,
        label: options[index].text.clone(),
    })
}

/// Mode 2: a win lands on the reserved win segment, a loss on any of the others.
pub fn select_win_rate<R: Rng + ?Sized>(
    win_rate: f64,
    win_text: &str,
    lose_text: &str,
    rng: &mut R,
) -> Selection {
    if rng.gen::<f64>() < win_rate / 100.0 {
        return Selection {
            index: WIN_INDEX,
            label: win_text.to_string(),
        };
    }

    Selection {
        index: rng.gen_range(0..WIN_INDEX),
        label: lose_text.to_string(),
    }
}

/// Draws according to the config's active mode.
pub fn select<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Option<Selection> {
    match config.mode {
        GameMode::Weighted => select_weighted(&config.mode1_options, rng),
        GameMode::WinRate => Some(select_win_rate(
            config.mode2_win_rate,
            &config.mode2_win_text,
            &config.mode2_lose_text,
            rng,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEGMENT_COUNT;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TRIALS: usize = 100_000;

    fn options(weights: &[f64]) -> Vec<PrizeOption> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| PrizeOption::new(format!("奖品{}", i + 1), w))
            .collect()
    }

    fn assert_distribution(weights: &[f64], seed: u64) {
        let options = options(weights);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut counts = vec![0usize; options.len()];

        for _ in 0..TRIALS {
            let selection = select_weighted(&options, &mut rng).unwrap();
            assert!(selection.index < SEGMENT_COUNT);
            assert_eq!(selection.label, options[selection.index].text);
            counts[selection.index] += 1;
        }

        for (i, &weight) in weights.iter().enumerate() {
            let observed = counts[i] as f64 * 100.0 / TRIALS as f64;
            assert!(
                (observed - weight).abs() < 1.0,
                "segment {} expected {}% got {:.3}%",
                i,
                weight,
                observed
            );
        }
    }

    #[test]
    fn test_default_weights_distribution() {
        let config = GameConfig::default();
        let weights: Vec<f64> = config.mode1_options.iter().map(|o| o.probability).collect();
        assert_distribution(&weights, 7);
    }

    #[test]
    fn test_skewed_weights_distribution() {
        assert_distribution(&[50.0, 20.0, 10.0, 5.0, 5.0, 2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 1.0], 42);
    }

    #[test]
    fn test_zero_weight_segments_are_skipped() {
        let mut weights = [0.0; SEGMENT_COUNT];
        weights[3] = 60.0;
        weights[9] = 40.0;
        let options = options(&weights);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..10_000 {
            let selection = select_weighted(&options, &mut rng).unwrap();
            assert!(selection.index == 3 || selection.index == 9);
        }
    }

    #[test]
    fn test_empty_or_zero_total_has_no_selection() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_weighted(&[], &mut rng).is_none());
        assert!(select_weighted(&options(&[0.0; SEGMENT_COUNT]), &mut rng).is_none());
    }

    #[test]
    fn test_win_rate_extremes() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10_000 {
            let win = select_win_rate(100.0, "中奖了!", "没中奖", &mut rng);
            assert_eq!(win.index, WIN_INDEX);
            assert_eq!(win.label, "中奖了!");

            let loss = select_win_rate(0.0, "中奖了!", "没中奖", &mut rng);
            assert!(loss.index < WIN_INDEX);
            assert_eq!(loss.label, "没中奖");
        }
    }

    #[test]
    fn test_win_index_only_carries_win_label() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut wins = 0;
        for _ in 0..TRIALS {
            let selection = select_win_rate(30.0, "WIN", "LOSE", &mut rng);
            if selection.index == WIN_INDEX {
                assert_eq!(selection.label, "WIN");
                wins += 1;
            } else {
                assert_eq!(selection.label, "LOSE");
            }
        }
        let observed = wins as f64 * 100.0 / TRIALS as f64;
        assert!((observed - 30.0).abs() < 1.0, "win rate {:.3}%", observed);
    }

    #[test]
    fn test_select_dispatches_on_mode() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut config = GameConfig::default();
        config.mode = GameMode::WinRate;
        config.mode2_win_rate = 100.0;
        let selection = select(&config, &mut rng).unwrap();
        assert_eq!(selection.index, WIN_INDEX);
        assert_eq!(selection.label, config.mode2_win_text);
    }
}
