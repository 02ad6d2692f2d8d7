//! Unit tests for capacity forecasting and snapshot assembly

use filecore::services::analyzer::assemble_snapshot;
use filecore::{FileCategory, Forecast, VolumeSpace, calculate_forecast};

const GB: u64 = 1024 * 1024 * 1024;

#[test]
fn zero_rate_is_stable_for_any_free_space() {
    for free in [0, 1, GB, u64::MAX] {
        assert_eq!(calculate_forecast(free, 0), Forecast::Stable);
    }
}

#[test]
fn boundaries_between_classes() {
    let rate = 7 * GB;

    assert_eq!(calculate_forecast(0, 1), Forecast::UnderOneDay);
    assert_eq!(calculate_forecast(rate - 1, rate), Forecast::UnderOneDay);
    assert_eq!(calculate_forecast(rate, rate), Forecast::Days(1));
    assert_eq!(calculate_forecast(29 * rate, rate), Forecast::Days(29));
    assert_eq!(calculate_forecast(30 * rate, rate), Forecast::Months(1));
    assert_eq!(calculate_forecast(364 * rate, rate), Forecast::Months(12));
    assert_eq!(calculate_forecast(365 * rate, rate), Forecast::OverOneYear);
    assert_eq!(calculate_forecast(u64::MAX, 1), Forecast::OverOneYear);
}

#[test]
fn display_strings() {
    assert_eq!(Forecast::Stable.to_string(), "Stable");
    assert_eq!(Forecast::UnderOneDay.to_string(), "< 1 day");
    assert_eq!(Forecast::Days(1).to_string(), "Full in ~1 day");
    assert_eq!(Forecast::Days(12).to_string(), "Full in ~12 days");
    assert_eq!(Forecast::Months(1).to_string(), "Full in ~1 month");
    assert_eq!(Forecast::Months(6).to_string(), "Full in ~6 months");
    assert_eq!(Forecast::OverOneYear.to_string(), "> 1 year left");
}

#[test]
fn snapshot_residual_fills_used() {
    let space = VolumeSpace {
        total_bytes: 1000,
        free_bytes: 400,
    };
    let measured = [
        (FileCategory::Image, 100),
        (FileCategory::Archive, 50),
        (FileCategory::Apk, 25),
    ];

    let info = assemble_snapshot(space, &measured, 10);

    assert_eq!(info.used_bytes, 600);
    assert_eq!(info.image_bytes, 100);
    assert_eq!(info.archive_bytes, 50);
    assert_eq!(info.app_bytes, 25);
    assert_eq!(info.trash_bytes, 10);
    assert_eq!(info.other_bytes, 415);
}

#[test]
fn snapshot_caps_in_fixed_order() {
    let space = VolumeSpace {
        total_bytes: 100,
        free_bytes: 0,
    };
    let measured = [(FileCategory::Video, 80), (FileCategory::Image, 60)];

    let info = assemble_snapshot(space, &measured, 30);

    assert_eq!(info.image_bytes, 60);
    assert_eq!(info.video_bytes, 40);
    assert_eq!(info.trash_bytes, 0);
    assert_eq!(info.other_bytes, 0);
    assert_eq!(info.category_sum(), info.used_bytes);
}
