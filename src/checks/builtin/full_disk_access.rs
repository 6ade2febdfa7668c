use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::indicator::Indicator;
use crate::probe::ProbeSpec;

const TCC_DB: &str = "~/Library/Application Support/com.apple.TCC/TCC.db";

/// TCC service identifier for Full Disk Access.
const FULL_DISK_ACCESS: &str = "kTCCServiceSystemPolicyAllFiles";

pub fn probe() -> ProbeSpec {
    ProbeSpec::sqlite(
        TCC_DB,
        format!("SELECT client, service FROM access WHERE service='{FULL_DISK_ACCESS}';"),
    )
}

/// Every client holding Full Disk Access is listed as evidence.
pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("full-disk-access")
        .description("Applications granted Full Disk Access")
        .probe(probe())
        .indicator(Indicator::substring(FULL_DISK_ACCESS).case_sensitive())
        .platform("macos")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, CheckStatus};
    use crate::probe::{FixtureProbe, ProbeError};

    #[test]
    fn every_grant_is_evidence() {
        let probe = FixtureProbe::new().with_text(
            &probe(),
            "com.apple.Terminal|kTCCServiceSystemPolicyAllFiles\n\
             com.unknown.helper|kTCCServiceSystemPolicyAllFiles\n",
        );
        let result = check().unwrap().execute(&probe);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.evidence.len(), 2);
    }

    #[test]
    fn no_grants_passes() {
        let probe = FixtureProbe::new().with_text(&probe(), "");
        assert_eq!(check().unwrap().execute(&probe).status, CheckStatus::Pass);
    }

    #[test]
    fn missing_database_is_error_not_pass() {
        let probe = FixtureProbe::new().with_error(
            &probe(),
            ProbeError::Missing { path: TCC_DB.into() },
        );
        assert_eq!(check().unwrap().execute(&probe).status, CheckStatus::Error);
    }
}
