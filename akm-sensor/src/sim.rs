//! Register-level models of AKM chips for the simulated buses

use akm_transport::{RegisterFile, SimTarget};

use crate::ak0991x::Ak0991xVariant;
use crate::registers::{ak0991x, ak8963, AKM_COMPANY_ID};

/// Magnetic field the model reports, in raw counts
#[derive(Debug, Clone, Copy, Default)]
struct Field {
    x: i16,
    y: i16,
    z: i16,
    overflow: bool,
}

/// Copy `field` into the six axis registers at `hxl`
fn latch(regs: &mut RegisterFile, hxl: u8, field: Field) {
    for (i, v) in [field.x, field.y, field.z].into_iter().enumerate() {
        let [lo, hi] = v.to_le_bytes();
        regs.set(hxl + 2 * i as u8, lo);
        regs.set(hxl + 2 * i as u8 + 1, hi);
    }
}

/// AK0991X model
///
/// Single measurements complete instantly and drop back to power-down.
/// Reading ST2 clears DRDY; in continuous mode the next sample is latched
/// right away.
#[derive(Debug, Clone)]
pub struct SimAk0991x {
    regs: RegisterFile,
    company_id: u8,
    device_id: u8,
    field: Field,
    resets: u32,
    mode_writes: u32,
}

impl SimAk0991x {
    pub fn new(variant: Ak0991xVariant) -> Self {
        let mut sim = Self {
            regs: RegisterFile::new(),
            company_id: AKM_COMPANY_ID,
            device_id: variant.device_id(),
            field: Field::default(),
            resets: 0,
            mode_writes: 0,
        };
        sim.power_on_reset();
        sim
    }

    fn power_on_reset(&mut self) {
        self.regs.fill(0);
        self.regs.set(ak0991x::WIA1, self.company_id);
        self.regs.set(ak0991x::WIA2, self.device_id);
    }

    pub fn set_company_id(&mut self, id: u8) {
        self.company_id = id;
        self.regs.set(ak0991x::WIA1, id);
    }

    pub fn set_field(&mut self, x: i16, y: i16, z: i16) {
        self.field.x = x;
        self.field.y = y;
        self.field.z = z;
    }

    pub fn set_overflow(&mut self, overflow: bool) {
        self.field.overflow = overflow;
    }

    /// Current CNTL2 mode bits
    pub fn mode(&self) -> u8 {
        self.regs.get(ak0991x::CNTL2) & ak0991x::MODE_MASK
    }

    /// Number of soft resets seen
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Number of CNTL2 writes seen
    pub fn mode_writes(&self) -> u32 {
        self.mode_writes
    }

    fn measure(&mut self) {
        latch(&mut self.regs, ak0991x::HXL, self.field);
        let st2 = if self.field.overflow { ak0991x::ST2_HOFL } else { 0 };
        self.regs.set(ak0991x::ST2, st2);
        self.regs.set(ak0991x::ST1, ak0991x::ST1_DRDY);
    }
}

impl SimTarget for SimAk0991x {
    fn read_reg(&mut self, reg: u8) -> u8 {
        let val = self.regs.get(reg);
        if reg == ak0991x::ST2 {
            self.regs.set(ak0991x::ST1, 0);
            if matches!(
                self.mode(),
                ak0991x::MODE_CONT_1 | ak0991x::MODE_CONT_2 | ak0991x::MODE_CONT_3 | ak0991x::MODE_CONT_4
            ) {
                self.measure();
            }
        }
        val
    }

    fn write_reg(&mut self, reg: u8, val: u8) {
        match reg {
            ak0991x::WIA1 | ak0991x::WIA2 | ak0991x::ST1..=ak0991x::ST2 => {}
            ak0991x::CNTL2 => {
                self.mode_writes += 1;
                let mode = val & ak0991x::MODE_MASK;
                self.regs.set(reg, mode);
                match mode {
                    ak0991x::MODE_POWER_DOWN => self.regs.set(ak0991x::ST1, 0),
                    ak0991x::MODE_SINGLE => {
                        self.measure();
                        self.regs.set(ak0991x::CNTL2, ak0991x::MODE_POWER_DOWN);
                    }
                    _ => self.measure(),
                }
            }
            ak0991x::CNTL3 if val & ak0991x::CNTL3_SRST != 0 => {
                self.resets += 1;
                self.power_on_reset();
            }
            _ => self.regs.set(reg, val),
        }
    }
}

/// AK8963 model
#[derive(Debug, Clone)]
pub struct SimAk8963 {
    regs: RegisterFile,
    info: u8,
    field: Field,
    resets: u32,
    last_cntl1: u8,
}

impl Default for SimAk8963 {
    fn default() -> Self {
        Self::new()
    }
}

impl SimAk8963 {
    pub fn new() -> Self {
        let mut sim = Self {
            regs: RegisterFile::new(),
            info: 0x9a,
            field: Field::default(),
            resets: 0,
            last_cntl1: 0,
        };
        sim.power_on_reset();
        sim
    }

    fn power_on_reset(&mut self) {
        self.regs.fill(0);
        self.regs.set(ak8963::WIA, AKM_COMPANY_ID);
        self.regs.set(ak8963::INFO, self.info);
        // Fuse ROM sensitivity values, nominal
        for i in 0..3 {
            self.regs.set(ak8963::ASAX + i, 0x80);
        }
    }

    pub fn info(&self) -> u8 {
        self.info
    }

    pub fn set_field(&mut self, x: i16, y: i16, z: i16) {
        self.field.x = x;
        self.field.y = y;
        self.field.z = z;
    }

    pub fn set_overflow(&mut self, overflow: bool) {
        self.field.overflow = overflow;
    }

    pub fn mode(&self) -> u8 {
        self.regs.get(ak8963::CNTL1) & ak8963::MODE_MASK
    }

    /// Last value written to CNTL1
    pub fn last_cntl1(&self) -> u8 {
        self.last_cntl1
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    fn measure(&mut self) {
        latch(&mut self.regs, ak8963::HXL, self.field);
        let mut st2 = self.last_cntl1 & ak8963::CNTL1_BIT;
        if self.field.overflow {
            st2 |= ak8963::ST2_HOFL;
        }
        self.regs.set(ak8963::ST2, st2);
        self.regs.set(ak8963::ST1, ak8963::ST1_DRDY);
    }
}

impl SimTarget for SimAk8963 {
    fn read_reg(&mut self, reg: u8) -> u8 {
        let val = self.regs.get(reg);
        if reg == ak8963::ST2 {
            self.regs.set(ak8963::ST1, 0);
            if matches!(self.mode(), ak8963::MODE_CONT_1 | ak8963::MODE_CONT_2) {
                self.measure();
            }
        }
        val
    }

    fn write_reg(&mut self, reg: u8, val: u8) {
        match reg {
            ak8963::WIA | ak8963::INFO | ak8963::ST1..=ak8963::ST2 => {}
            ak8963::CNTL1 => {
                self.last_cntl1 = val;
                self.regs.set(reg, val);
                match val & ak8963::MODE_MASK {
                    ak8963::MODE_POWER_DOWN | ak8963::MODE_FUSE_ROM => {
                        self.regs.set(ak8963::ST1, 0)
                    }
                    ak8963::MODE_SINGLE => {
                        self.measure();
                        self.regs.set(reg, val & !ak8963::MODE_MASK);
                    }
                    _ => self.measure(),
                }
            }
            ak8963::CNTL2 if val & ak8963::CNTL2_SRST != 0 => {
                self.resets += 1;
                self.power_on_reset();
            }
            ak8963::ASAX..=0x12 => {}
            _ => self.regs.set(reg, val),
        }
    }
}
