//! What the device advertises about itself.

use std::sync::Arc;

use crate::terms::PaymentTerms;

/// Read-only device profile answered by the command router.
///
/// Built once at startup and shared between connections behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    name: String,
    logo: String,
    banner: String,
    description: String,
    options: Vec<String>,
    frequency: u32,
    allow_custom_content: bool,
    terms: Arc<PaymentTerms>,
}

impl DeviceProfile {
    /// Creates a profile with empty display fields.
    #[must_use]
    pub fn new(name: impl Into<String>, terms: Arc<PaymentTerms>) -> Self {
        Self {
            name: name.into(),
            logo: String::new(),
            banner: String::new(),
            description: String::new(),
            options: Vec::new(),
            frequency: 0,
            allow_custom_content: false,
            terms,
        }
    }

    /// Sets the logo URL or inline data.
    #[must_use]
    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = logo.into();
        self
    }

    /// Sets the banner URL or inline data.
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    /// Sets the product description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the options a buyer may pick from.
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the recurring frequency hint. Zero means unset.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency;
        self
    }

    /// Allows or forbids buyer-supplied custom text.
    #[must_use]
    pub const fn with_custom_content(mut self, allow: bool) -> Self {
        self.allow_custom_content = allow;
        self
    }

    /// Device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logo URL or data.
    #[must_use]
    pub fn logo(&self) -> &str {
        &self.logo
    }

    /// Banner URL or data.
    #[must_use]
    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Product description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Selectable options.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Recurring frequency hint.
    #[must_use]
    pub const fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Whether buyers may attach custom text.
    #[must_use]
    pub const fn allow_custom_content(&self) -> bool {
        self.allow_custom_content
    }

    /// The payment terms for this device's resource.
    #[must_use]
    pub const fn terms(&self) -> &Arc<PaymentTerms> {
        &self.terms
    }
}
