//! Unit tests for SMA indicator

use traderoad::indicators::trend::calculate_sma;
use traderoad::models::Candle;

fn create_test_candles(count: usize) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.1;
            Candle::new(1_700_000_000 + i as i64 * 60, price, price + 1.0, price - 1.0, price)
        })
        .collect()
}

#[test]
fn test_sma_insufficient_data() {
    let candles = create_test_candles(9);
    assert!(calculate_sma(&candles, 10).is_empty());
    assert!(calculate_sma(&candles, 0).is_empty());
}

#[test]
fn test_sma_matches_naive_mean() {
    let candles = create_test_candles(60);
    let period = 7;
    let sma = calculate_sma(&candles, period);
    assert_eq!(sma.len(), candles.len() - period + 1);

    for (offset, point) in sma.points.iter().enumerate() {
        let end = offset + period;
        let naive: f64 = candles[offset..end].iter().map(|c| c.close).sum::<f64>() / period as f64;
        assert_eq!(point.time, candles[end - 1].time);
        assert!((point.value - naive).abs() < 1e-9);
    }
}

#[test]
fn test_sma_period_one_is_close() {
    let candles = create_test_candles(5);
    let sma = calculate_sma(&candles, 1);
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    assert_eq!(sma.values().collect::<Vec<_>>(), closes);
}
