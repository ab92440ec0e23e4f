use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::BRAND_NAME;
use crate::scheduling::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInfo {
    pub brand_name: String,
    pub brand_description: String,
    pub brand_slogan: String,
    pub copyright_year: i32,
    pub copyright_text: String,
    pub website: String,
    pub support_email: String,
    pub support_phone: String,
}

impl BrandInfo {
    pub fn for_year(year: i32) -> Self {
        Self {
            brand_name: BRAND_NAME.to_string(),
            brand_description: "智能工作流平台".to_string(),
            brand_slogan: "让您轻松创建和管理工作流程".to_string(),
            copyright_year: year,
            copyright_text: "保留所有权利".to_string(),
            website: "https://jilang-agent.com".to_string(),
            support_email: "support@jilang-agent.com".to_string(),
            support_phone: "+86 400-123-4567".to_string(),
        }
    }
}

/// Product naming and contact details shown in headers, footers and the
/// about page.
pub struct BrandStore {
    info: RefCell<BrandInfo>,
}

impl BrandStore {
    /// The copyright year is the clock's current UTC year.
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        let year = i64::try_from(clock.now_ms())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map_or(1970, |now| now.year());
        Self {
            info: RefCell::new(BrandInfo::for_year(year)),
        }
    }

    pub fn info(&self) -> BrandInfo {
        self.info.borrow().clone()
    }

    pub fn name(&self) -> String {
        self.info.borrow().brand_name.clone()
    }

    pub fn full_copyright(&self) -> String {
        let info = self.info.borrow();
        format!(
            "© {} {}. {}",
            info.copyright_year, info.brand_name, info.copyright_text
        )
    }

    pub fn full_description(&self) -> String {
        let info = self.info.borrow();
        format!(
            "{} - {}，{}",
            info.brand_name, info.brand_description, info.brand_slogan
        )
    }

    pub fn welcome_message(&self) -> String {
        format!("欢迎使用{}系统", self.info.borrow().brand_name)
    }

    pub fn update_brand_name(&self, name: &str) {
        self.info.borrow_mut().brand_name = name.to_string();
    }

    pub fn update_brand_description(&self, description: &str) {
        self.info.borrow_mut().brand_description = description.to_string();
    }

    pub fn update_brand_slogan(&self, slogan: &str) {
        self.info.borrow_mut().brand_slogan = slogan.to_string();
    }

    /// Overwrite the fields present in `patch` (camelCase keys).  Unknown
    /// keys are ignored; a mistyped value rejects the whole patch.
    pub fn update_brand_info(&self, patch: &Value) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self.info.borrow())?;
        if let (Some(target), Some(source)) = (current.as_object_mut(), patch.as_object()) {
            for (key, value) in source {
                if let Some(slot) = target.get_mut(key) {
                    *slot = value.clone();
                }
            }
        }
        *self.info.borrow_mut() = serde_json::from_value(current)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::ManualClock;
    use serde_json::json;

    fn brand() -> BrandStore {
        // 2024-06-01T00:00:00Z
        BrandStore::new(Rc::new(ManualClock::new(1_717_200_000_000)))
    }

    #[test]
    fn derived_texts() {
        let brand = brand();
        assert_eq!(brand.full_copyright(), "© 2024 JiLang Agent. 保留所有权利");
        assert_eq!(
            brand.full_description(),
            "JiLang Agent - 智能工作流平台，让您轻松创建和管理工作流程"
        );
        assert_eq!(brand.welcome_message(), "欢迎使用JiLang Agent系统");
    }

    #[test]
    fn updates() {
        let brand = brand();
        brand.update_brand_name("Acme");
        assert_eq!(brand.welcome_message(), "欢迎使用Acme系统");

        brand
            .update_brand_info(&json!({"brandSlogan": "更快", "unknown": 1}))
            .unwrap();
        assert_eq!(brand.info().brand_slogan, "更快");

        assert!(brand.update_brand_info(&json!({"copyrightYear": "soon"})).is_err());
        assert_eq!(brand.info().copyright_year, 2024);
    }
}
