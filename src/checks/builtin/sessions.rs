use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

pub fn probe() -> ProbeSpec {
    ProbeSpec::command("who", Vec::<String>::new())
}

/// More than one active session is treated as worth a look.
pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("logged-in-users")
        .description("More than one logged-in session")
        .probe(probe())
        .indicator(Indicator::max_records(1))
        .build()
}
