use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

const SUSPICIOUS_NAMES: &[&str] = &["keylogger", "crypto", "miner", "rootkit", "netcat", "nmap"];

pub fn probe() -> ProbeSpec {
    ProbeSpec::command("ps", ["aux"])
}

pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("suspicious-processes")
        .description("Running processes named like keyloggers, miners or scanners")
        .probe(probe())
        .indicators(Indicator::substrings(SUSPICIOUS_NAMES.iter().copied()))
        // netcat listener
        .indicator(Indicator::keyword("nc -l"))
        .build()
}
