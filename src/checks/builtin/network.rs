use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

/// Ports favoured by backdoors, IRC botnets and old trojans.
const SUSPICIOUS_PORTS: &[&str] = &[":1337", ":31337", ":6667", ":12345", ":31338"];

/// Established sockets, one per line. lsof exits 1 when nothing matches.
pub fn probe() -> ProbeSpec {
    ProbeSpec::command("lsof", ["-i", "-P", "-n", "-sTCP:ESTABLISHED"]).accept_exit(1)
}

pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("network-connections")
        .description("Established connections on known backdoor ports")
        .probe(probe())
        .indicators(Indicator::substrings(SUSPICIOUS_PORTS.iter().copied()))
        .build()
}
