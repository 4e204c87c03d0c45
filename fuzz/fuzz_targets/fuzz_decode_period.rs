#![no_main]

//! Fuzz target for trend period decoding.
//!
//! Any string must either decode to a period inside the supported range or
//! be rejected, and the windows derived from it must never underflow.

use libfuzzer_sys::fuzz_target;

use curtis::trends::{decode_period, trend_from_buckets, MAX_PERIOD_DAYS, MAX_PERIOD_HOURS};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(period) = decode_period(text) else {
        return;
    };

    assert!(period.days <= MAX_PERIOD_DAYS);
    assert!(period.hours <= MAX_PERIOD_HOURS);
    assert!(period.length() >= 1);

    let buckets: Vec<(i64, u64)> = data.iter().map(|b| (0, u64::from(*b))).collect();
    let trend = trend_from_buckets(
        &buckets,
        period.stats_period.latest_index(),
        period.length() as usize,
        1.0,
    );
    if let Some(ratio) = trend.ratio {
        assert!(ratio.is_finite());
    }
});
