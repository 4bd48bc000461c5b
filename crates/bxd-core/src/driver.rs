//! Joint actuation metadata
//!
//! A `Driver` describes how a joint is actuated: the actuator family, how it
//! is addressed (PWM or CAN, two port numbers), and the gearing between the
//! actuator and the joint. Type and signal are closed enumerations rendered
//! as fixed wire-format tokens; adding a variant forces every renderer to be
//! updated at compile time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A token that is not part of a closed enumeration
#[derive(Debug, Clone, Error)]
#[error("unrecognized {what} token: {token}")]
pub struct TokenError {
    pub what: &'static str,
    pub token: String,
}

/// Actuator family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriverType {
    #[default]
    Unknown,
    Motor,
    Servo,
    WormScrew,
    BumperPneumatic,
    RelayPneumatic,
    DualMotor,
    Elevator,
}

impl DriverType {
    /// Wire-format token
    pub fn token(&self) -> &'static str {
        match self {
            DriverType::Unknown => "UNKNOWN",
            DriverType::Motor => "MOTOR",
            DriverType::Servo => "SERVO",
            DriverType::WormScrew => "WORM_SCREW",
            DriverType::BumperPneumatic => "BUMPER_PNEUMATIC",
            DriverType::RelayPneumatic => "RELAY_PNEUMATIC",
            DriverType::DualMotor => "DUAL_MOTOR",
            DriverType::Elevator => "ELEVATOR",
        }
    }

    /// Whether this actuator family addresses a second port
    pub fn uses_port_b(&self) -> bool {
        matches!(
            self,
            DriverType::BumperPneumatic | DriverType::DualMotor | DriverType::Elevator
        )
    }
}

impl FromStr for DriverType {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN" => Ok(DriverType::Unknown),
            "MOTOR" => Ok(DriverType::Motor),
            "SERVO" => Ok(DriverType::Servo),
            "WORM_SCREW" => Ok(DriverType::WormScrew),
            "BUMPER_PNEUMATIC" => Ok(DriverType::BumperPneumatic),
            "RELAY_PNEUMATIC" => Ok(DriverType::RelayPneumatic),
            "DUAL_MOTOR" => Ok(DriverType::DualMotor),
            "ELEVATOR" => Ok(DriverType::Elevator),
            _ => Err(TokenError {
                what: "driver type",
                token: s.to_string(),
            }),
        }
    }
}

/// Signal wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalType {
    #[default]
    Pwm,
    Can,
}

impl SignalType {
    /// Wire-format token
    pub fn token(&self) -> &'static str {
        match self {
            SignalType::Pwm => "PWM",
            SignalType::Can => "CAN",
        }
    }
}

impl FromStr for SignalType {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PWM" => Ok(SignalType::Pwm),
            "CAN" => Ok(SignalType::Can),
            _ => Err(TokenError {
                what: "signal",
                token: s.to_string(),
            }),
        }
    }
}

/// Actuation metadata attached to one joint
///
/// A driver has no lifecycle of its own: it is owned by the joint it
/// actuates, and cloning it duplicates the scalar fields only. Gear ratios
/// are positive; 1.0 means direct drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub driver_type: DriverType,
    pub signal: SignalType,
    pub port_a: u16,
    /// Unused by actuator families where `uses_port_b()` is false
    pub port_b: u16,
    pub input_gear: f32,
    pub output_gear: f32,
}

impl Driver {
    /// Create a direct-drive driver on one port
    pub fn new(driver_type: DriverType, signal: SignalType, port_a: u16) -> Self {
        Self {
            driver_type,
            signal,
            port_a,
            port_b: 0,
            input_gear: 1.0,
            output_gear: 1.0,
        }
    }

    /// Set the secondary port
    pub fn with_port_b(mut self, port_b: u16) -> Self {
        self.port_b = port_b;
        self
    }

    /// Set input/output gear ratios
    pub fn with_gearing(mut self, input_gear: f32, output_gear: f32) -> Self {
        self.input_gear = input_gear;
        self.output_gear = output_gear;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_type_tokens_round_trip() {
        let all = [
            DriverType::Unknown,
            DriverType::Motor,
            DriverType::Servo,
            DriverType::WormScrew,
            DriverType::BumperPneumatic,
            DriverType::RelayPneumatic,
            DriverType::DualMotor,
            DriverType::Elevator,
        ];
        for ty in all {
            assert_eq!(ty.token().parse::<DriverType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_unrecognized_token_fails() {
        assert!("TREAD".parse::<DriverType>().is_err());
        assert!("I2C".parse::<SignalType>().is_err());
        assert!("motor".parse::<DriverType>().is_err());
    }

    #[test]
    fn test_clone_duplicates_scalars() {
        let driver = Driver::new(DriverType::DualMotor, SignalType::Can, 3)
            .with_port_b(4)
            .with_gearing(12.0, 1.0);
        let copy = driver.clone();
        assert_eq!(copy, driver);
    }

    #[test]
    fn test_port_b_usage() {
        assert!(!DriverType::Motor.uses_port_b());
        assert!(DriverType::DualMotor.uses_port_b());
    }
}
