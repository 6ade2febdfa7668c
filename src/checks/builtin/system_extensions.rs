use crate::checks::IndicatorCheck;
use crate::error::Result;
use crate::probe::ProbeSpec;

pub fn probe() -> ProbeSpec {
    ProbeSpec::command("systemextensionsctl", ["list"])
}

/// Listed for the operator to eyeball; never fails on content.
pub fn check() -> Result<IndicatorCheck> {
    IndicatorCheck::builder("system-extensions")
        .description("Installed system extensions (informational)")
        .probe(probe())
        .informational()
        .platform("macos")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{Check, CheckStatus};
    use crate::probe::FixtureProbe;

    #[test]
    fn passes_and_keeps_listing() {
        let probe = FixtureProbe::new().with_text(
            &probe(),
            "1 extension(s)\n--- com.apple.system_extension.network_extension\n\
             enabled active teamID bundleID (version) name [state]\n\
             *\t*\tABCDE12345\tcom.vpn.client.ext (1.0/1)\tVPN\t[activated enabled]\n",
        );
        let result = check().unwrap().execute(&probe);
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.notes.len(), 4);
        assert!(result.evidence.is_empty());
    }
}
