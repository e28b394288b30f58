use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ClimateError {
    #[error("MQTT broker {0} did not acknowledge the connection")]
    BrokerUnreachable(String),

    #[error("MQTT event loop stopped before the connection was established")]
    EventLoopStopped,

    #[error("MQTT client error: {0}")]
    MqttClient(#[from] rumqttc::ClientError),

    #[error("Invalid setpoint: {0}")]
    InvalidSetpoint(String),

    #[error("Enrollment input closed")]
    EnrollmentInputClosed,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClimateError>;
