//! Accelerometer/gyroscope register map (MPU-6050 class devices)

/// Device address with AD0 tied low
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Device address with AD0 tied high
pub const ALT_ADDRESS: u8 = 0x69;

/// Value of [`reg::WHO_AM_I`] on a genuine part
pub const IDENTITY: u8 = 0x68;

/// Bytes per three-axis sample (X, Y, Z, high byte first)
pub const AXIS_BYTES: u8 = 6;

/// Register addresses
pub mod reg {
    /// Sample rate divider (clock divider for the output data rate)
    pub const SMPLRT_DIV: u8 = 0x19;
    /// Digital low-pass filter configuration
    pub const CONFIG: u8 = 0x1A;
    /// Gyroscope full-scale range
    pub const GYRO_CONFIG: u8 = 0x1B;
    /// Accelerometer full-scale range
    pub const ACCEL_CONFIG: u8 = 0x1C;
    /// First accelerometer output register
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    /// Temperature output, high byte
    pub const TEMP_OUT_H: u8 = 0x41;
    /// First gyroscope output register
    pub const GYRO_XOUT_H: u8 = 0x43;
    /// Power management 1 (sleep, clock source)
    pub const PWR_MGMT_1: u8 = 0x6B;
    /// Power management 2 (per-axis standby)
    pub const PWR_MGMT_2: u8 = 0x6C;
    /// Device identification
    pub const WHO_AM_I: u8 = 0x75;
}
