use crate::server::model::money::Percent;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Restaurant-wide billing settings, applied to every bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Settings {
    pub tax_percent: Percent,
    pub service_fee_percent: Percent,
    /// suggested tip percentages, in display order
    pub tip_presets: Vec<Percent>,
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub(crate) enum InvalidSettings {
    #[display("tax percent must not exceed 100")]
    TaxAboveHundred,
    #[display("service fee percent must not exceed 100")]
    ServiceFeeAboveHundred,
}

impl Settings {
    pub fn validate(&self) -> Result<(), InvalidSettings> {
        if self.tax_percent > Percent::HUNDRED {
            return Err(InvalidSettings::TaxAboveHundred);
        }
        if self.service_fee_percent > Percent::HUNDRED {
            return Err(InvalidSettings::ServiceFeeAboveHundred);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PatchSettingsRequest {
    pub tax_percent: Option<Percent>,
    pub service_fee_percent: Option<Percent>,
    pub tip_presets: Option<Vec<Percent>>,
}

impl PatchSettingsRequest {
    /// Overlay the supplied fields on `current`, validating the result.
    pub fn apply(self, current: &Settings) -> Result<Settings, InvalidSettings> {
        let settings = Settings {
            tax_percent: self.tax_percent.unwrap_or(current.tax_percent),
            service_fee_percent: self.service_fee_percent.unwrap_or(current.service_fee_percent),
            tip_presets: self.tip_presets.unwrap_or_else(|| current.tip_presets.clone()),
        };
        settings.validate()?;
        Ok(settings)
    }
}
