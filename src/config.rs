//! PATCH processing configuration.
//!
//! [`PatchConfig`] controls the protocol leniencies of the PATCH engine. It is a
//! plain value that can be built fluently or deserialized from a service
//! provider configuration document.
//!
//! The `ms_azure_*` and `activate_sails_point_workaround` switches accept
//! request shapes that specific identity providers send although RFC 7644
//! does not allow them. They are all off by default.

use serde::{Deserialize, Serialize};

/// Default upper bound on the number of operations in a single request.
pub const DEFAULT_MAX_OPERATIONS: usize = 1000;

/// Configuration for PATCH request processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchConfig {
    /// Whether PATCH is supported at all
    pub supported: bool,
    /// Skip unknown attributes in resource-scoped values instead of failing
    pub ignore_unknown_attributes: bool,
    /// Accept numeric and boolean values that arrive as strings
    pub coerce_string_values: bool,
    /// Maximum number of operations accepted in one request
    pub max_operations: usize,
    /// Treat a removal or filter that finds nothing as a no-op instead of a
    /// `noTarget` error
    pub do_not_fail_on_no_target: bool,
    /// Apply replace on a singular complex attribute like add
    pub activate_sails_point_workaround: bool,
    /// Turn an add on `attr[key eq "x"].sub` matching no element into a new
    /// element carrying both `key` and `sub`
    pub ms_azure_filter_workaround: bool,
    /// Unwrap `{"value": "<json object>"}` elements into the object they carry
    pub ms_azure_value_sub_attribute_workaround: bool,
    /// Wrap a simple value given for a complex attribute as `{"value": ...}`
    pub ms_azure_complex_simple_value_workaround: bool,
    /// Turn a remove with a value into a remove with an equivalent filter
    pub ms_azure_remove_workaround: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            supported: true,
            ignore_unknown_attributes: false,
            coerce_string_values: false,
            max_operations: DEFAULT_MAX_OPERATIONS,
            do_not_fail_on_no_target: true,
            activate_sails_point_workaround: false,
            ms_azure_filter_workaround: false,
            ms_azure_value_sub_attribute_workaround: false,
            ms_azure_complex_simple_value_workaround: false,
            ms_azure_remove_workaround: false,
        }
    }
}

impl PatchConfig {
    /// Start a builder from the default configuration.
    pub fn builder() -> PatchConfigBuilder {
        PatchConfigBuilder::default()
    }
}

/// Fluent builder for [`PatchConfig`].
///
/// ```rust
/// use scim_patch::config::PatchConfig;
///
/// let config = PatchConfig::builder()
///     .ignore_unknown_attributes(true)
///     .max_operations(50)
///     .build();
/// assert!(config.ignore_unknown_attributes);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatchConfigBuilder {
    config: PatchConfig,
}

impl PatchConfigBuilder {
    pub fn supported(mut self, supported: bool) -> Self {
        self.config.supported = supported;
        self
    }

    pub fn ignore_unknown_attributes(mut self, ignore: bool) -> Self {
        self.config.ignore_unknown_attributes = ignore;
        self
    }

    pub fn coerce_string_values(mut self, coerce: bool) -> Self {
        self.config.coerce_string_values = coerce;
        self
    }

    pub fn max_operations(mut self, max: usize) -> Self {
        self.config.max_operations = max;
        self
    }

    pub fn do_not_fail_on_no_target(mut self, lenient: bool) -> Self {
        self.config.do_not_fail_on_no_target = lenient;
        self
    }

    pub fn activate_sails_point_workaround(mut self, active: bool) -> Self {
        self.config.activate_sails_point_workaround = active;
        self
    }

    pub fn ms_azure_filter_workaround(mut self, active: bool) -> Self {
        self.config.ms_azure_filter_workaround = active;
        self
    }

    pub fn ms_azure_value_sub_attribute_workaround(mut self, active: bool) -> Self {
        self.config.ms_azure_value_sub_attribute_workaround = active;
        self
    }

    pub fn ms_azure_complex_simple_value_workaround(mut self, active: bool) -> Self {
        self.config.ms_azure_complex_simple_value_workaround = active;
        self
    }

    pub fn ms_azure_remove_workaround(mut self, active: bool) -> Self {
        self.config.ms_azure_remove_workaround = active;
        self
    }

    pub fn build(self) -> PatchConfig {
        self.config
    }
}
