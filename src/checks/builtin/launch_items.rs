use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

const LAUNCH_DIRS: &[&str] = &[
    "/Library/LaunchAgents",
    "/Library/LaunchDaemons",
    "~/Library/LaunchAgents",
];

pub fn probe() -> ProbeSpec {
    ProbeSpec::file_times(LAUNCH_DIRS.iter().copied())
}

/// Persistence via launchd: anything dropped there in the last week.
pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("launch-items")
        .description("Launch agents or daemons modified in the last 7 days")
        .probe(probe())
        .indicator(Indicator::age_days(7))
        .platform("macos")
        .build()
}
