//! Register maps of the supported AKM parts

/// WIA1 (AK0991X) / WIA (AK8963) value for Asahi Kasei Microdevices
pub const AKM_COMPANY_ID: u8 = 0x48;

/// AK0991X family register map
pub mod ak0991x {
    pub const WIA1: u8 = 0x00;
    pub const WIA2: u8 = 0x01;
    pub const ST1: u8 = 0x10;
    pub const HXL: u8 = 0x11;
    pub const TMPS: u8 = 0x17;
    pub const ST2: u8 = 0x18;
    pub const CNTL1: u8 = 0x30;
    pub const CNTL2: u8 = 0x31;
    pub const CNTL3: u8 = 0x32;

    pub const ST1_DRDY: u8 = 0x01;
    pub const ST2_HOFL: u8 = 0x08;
    pub const CNTL3_SRST: u8 = 0x01;

    pub const MODE_MASK: u8 = 0x1f;
    pub const MODE_POWER_DOWN: u8 = 0x00;
    pub const MODE_SINGLE: u8 = 0x01;
    /// Continuous measurement mode 1 (10 Hz)
    pub const MODE_CONT_1: u8 = 0x02;
    pub const MODE_CONT_2: u8 = 0x04;
    pub const MODE_CONT_3: u8 = 0x06;
    pub const MODE_CONT_4: u8 = 0x08;
    pub const MODE_SELF_TEST: u8 = 0x10;

    /// ST1 through ST2
    pub const BLOCK_LEN: usize = (ST2 - ST1 + 1) as usize;
}

/// AK8963 register map
pub mod ak8963 {
    pub const WIA: u8 = 0x00;
    pub const INFO: u8 = 0x01;
    pub const ST1: u8 = 0x02;
    pub const HXL: u8 = 0x03;
    pub const ST2: u8 = 0x09;
    pub const CNTL1: u8 = 0x0a;
    pub const CNTL2: u8 = 0x0b;
    pub const ASAX: u8 = 0x10;

    pub const ST1_DRDY: u8 = 0x01;
    pub const ST2_HOFL: u8 = 0x08;
    pub const CNTL2_SRST: u8 = 0x01;

    /// 16-bit output when set, 14-bit otherwise
    pub const CNTL1_BIT: u8 = 0x10;
    pub const MODE_MASK: u8 = 0x0f;
    pub const MODE_POWER_DOWN: u8 = 0x00;
    pub const MODE_SINGLE: u8 = 0x01;
    /// Continuous measurement mode 1 (8 Hz)
    pub const MODE_CONT_1: u8 = 0x02;
    /// Continuous measurement mode 2 (100 Hz)
    pub const MODE_CONT_2: u8 = 0x06;
    pub const MODE_SELF_TEST: u8 = 0x08;
    pub const MODE_FUSE_ROM: u8 = 0x0f;

    /// ST1 through ST2
    pub const BLOCK_LEN: usize = (ST2 - ST1 + 1) as usize;
}
