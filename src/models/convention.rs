//! Dealer positioning conventions
//!
//! Which side of each option dealers are assumed to hold is a modeling
//! hypothesis, so it is carried as a configurable value. The book multiplies
//! raw per-contract Greeks by `weight(contract)` and never looks at the
//! variant itself.

use serde::{Deserialize, Serialize};

use crate::core::{ContractSnapshot, OptionType};

/// Side of the dealer's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// Dealer convention applied to raw Greeks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DealerConvention {
    /// Dealers hold a fixed side per option type
    Fixed { call: Side, put: Side },
    /// Dealers hold a fraction of open interest per option type; weights in [-1, 1]
    Calibrated { call_weight: f64, put_weight: f64 },
    /// Side inferred per contract from customer open/close flow: customers
    /// net buying to open leaves dealers short, otherwise long. Contracts
    /// without flow data use the fallback sides. `invert_*` reverses the
    /// inferred side for that option type.
    CustomerFlow {
        fallback_call: Side,
        fallback_put: Side,
        #[serde(default)]
        invert_call: bool,
        #[serde(default)]
        invert_put: bool,
    },
}

impl DealerConvention {
    /// Dealers short calls, long puts (the textbook GEX assumption)
    pub fn short_calls_long_puts() -> Self {
        DealerConvention::Fixed {
            call: Side::Short,
            put: Side::Long,
        }
    }

    /// Dealers short everything they sold to customers
    pub fn short_all() -> Self {
        DealerConvention::Fixed {
            call: Side::Short,
            put: Side::Short,
        }
    }

    pub fn calibrated(call_weight: f64, put_weight: f64) -> Self {
        DealerConvention::Calibrated {
            call_weight: call_weight.clamp(-1.0, 1.0),
            put_weight: put_weight.clamp(-1.0, 1.0),
        }
    }

    /// Flow-based inference, falling back to short everything
    pub fn customer_flow() -> Self {
        DealerConvention::CustomerFlow {
            fallback_call: Side::Short,
            fallback_put: Side::Short,
            invert_call: false,
            invert_put: false,
        }
    }

    /// Coarse sign for an option type: +1 (dealer long) or -1 (dealer short)
    pub fn sign(&self, option_type: OptionType) -> f64 {
        match *self {
            DealerConvention::Fixed { call, put } => match option_type {
                OptionType::Call => call.sign(),
                OptionType::Put => put.sign(),
            },
            DealerConvention::Calibrated {
                call_weight,
                put_weight,
            } => {
                let w = match option_type {
                    OptionType::Call => call_weight,
                    OptionType::Put => put_weight,
                };
                if w < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            DealerConvention::CustomerFlow {
                fallback_call,
                fallback_put,
                ..
            } => match option_type {
                OptionType::Call => fallback_call.sign(),
                OptionType::Put => fallback_put.sign(),
            },
        }
    }

    /// Signed dealer share of one contract's open interest
    pub fn weight(&self, contract: &ContractSnapshot) -> f64 {
        match *self {
            DealerConvention::Fixed { .. } => self.sign(contract.option_type),
            DealerConvention::Calibrated {
                call_weight,
                put_weight,
            } => match contract.option_type {
                OptionType::Call => call_weight,
                OptionType::Put => put_weight,
            },
            DealerConvention::CustomerFlow {
                invert_call,
                invert_put,
                ..
            } => {
                let Some(flow) = contract.customer_flow else {
                    return self.sign(contract.option_type);
                };
                let inferred = if flow.net_customer_buying() > 0 { -1.0 } else { 1.0 };
                let inverted = match contract.option_type {
                    OptionType::Call => invert_call,
                    OptionType::Put => invert_put,
                };
                if inverted {
                    -inferred
                } else {
                    inferred
                }
            }
        }
    }

    /// Same convention with one option type's side negated
    pub fn with_flipped(&self, option_type: OptionType) -> Self {
        match *self {
            DealerConvention::Fixed { call, put } => match option_type {
                OptionType::Call => DealerConvention::Fixed {
                    call: call.opposite(),
                    put,
                },
                OptionType::Put => DealerConvention::Fixed {
                    call,
                    put: put.opposite(),
                },
            },
            DealerConvention::Calibrated {
                call_weight,
                put_weight,
            } => match option_type {
                OptionType::Call => DealerConvention::Calibrated {
                    call_weight: -call_weight,
                    put_weight,
                },
                OptionType::Put => DealerConvention::Calibrated {
                    call_weight,
                    put_weight: -put_weight,
                },
            },
            DealerConvention::CustomerFlow {
                fallback_call,
                fallback_put,
                invert_call,
                invert_put,
            } => match option_type {
                OptionType::Call => DealerConvention::CustomerFlow {
                    fallback_call: fallback_call.opposite(),
                    fallback_put,
                    invert_call: !invert_call,
                    invert_put,
                },
                OptionType::Put => DealerConvention::CustomerFlow {
                    fallback_call,
                    fallback_put: fallback_put.opposite(),
                    invert_call,
                    invert_put: !invert_put,
                },
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DealerConvention::Fixed { .. } => "fixed",
            DealerConvention::Calibrated { .. } => "calibrated",
            DealerConvention::CustomerFlow { .. } => "customer-flow",
        }
    }
}

impl Default for DealerConvention {
    fn default() -> Self {
        Self::short_calls_long_puts()
    }
}
