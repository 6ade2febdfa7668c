use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

const BINARY_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin"];

pub fn probe() -> ProbeSpec {
    ProbeSpec::file_times(BINARY_DIRS.iter().copied())
}

pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("system-binaries")
        .description("System binaries modified in the last 14 days")
        .probe(probe())
        .indicator(Indicator::age_days(14))
        .build()
}
