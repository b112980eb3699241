//! Custom baud rates through the Linux `TIOCGSERIAL` / `TIOCSSERIAL` ioctls.
//!
//! # How custom rates work (for beginners)
//!
//! A 16550-style UART derives its bit clock from a base clock (`baud_base`,
//! typically 115200) divided by an integer divisor.  The driver normally
//! picks the divisor from the `termios` speed.  With the `ASYNC_SPD_CUST`
//! flag set *and* the line at 38400 baud, it uses our `custom_divisor`
//! instead, giving an effective rate of `baud_base / custom_divisor`.

use std::io;
use std::os::fd::AsRawFd;

use nix::libc::{c_char, c_int, c_uchar, c_uint, c_ulong, c_ushort};

/// Speed selection bits in `serial_struct.flags`.
const ASYNC_SPD_MASK: c_int = 0x1030;
/// "Use `custom_divisor` when the line is at 38400 baud".
const ASYNC_SPD_CUST: c_int = 0x0030;

/// Mirror of the kernel's `struct serial_struct`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SerialStruct {
    kind: c_int,
    line: c_int,
    port: c_uint,
    irq: c_int,
    flags: c_int,
    xmit_fifo_size: c_int,
    custom_divisor: c_int,
    baud_base: c_int,
    close_delay: c_ushort,
    io_type: c_char,
    reserved_char: [c_char; 1],
    hub6: c_int,
    closing_wait: c_ushort,
    closing_wait2: c_ushort,
    iomem_base: *mut c_uchar,
    iomem_reg_shift: c_ushort,
    port_high: c_uint,
    iomap_base: c_ulong,
}

impl SerialStruct {
    fn zeroed() -> Self {
        Self {
            kind: 0,
            line: 0,
            port: 0,
            irq: 0,
            flags: 0,
            xmit_fifo_size: 0,
            custom_divisor: 0,
            baud_base: 0,
            close_delay: 0,
            io_type: 0,
            reserved_char: [0],
            hub6: 0,
            closing_wait: 0,
            closing_wait2: 0,
            iomem_base: std::ptr::null_mut(),
            iomem_reg_shift: 0,
            port_high: 0,
            iomap_base: 0,
        }
    }
}

nix::ioctl_read_bad!(tiocgserial, nix::libc::TIOCGSERIAL, SerialStruct);
nix::ioctl_write_ptr_bad!(tiocsserial, nix::libc::TIOCSSERIAL, SerialStruct);

fn read_serial_struct<F: AsRawFd>(fd: &F) -> io::Result<SerialStruct> {
    let mut ss = SerialStruct::zeroed();
    // SAFETY: `ss` is a valid, writable `serial_struct` for the duration of the call.
    unsafe { tiocgserial(fd.as_raw_fd(), &mut ss) }?;
    Ok(ss)
}

/// Reads the UART base clock of the line behind `fd`.
pub fn baud_base<F: AsRawFd>(fd: &F) -> io::Result<u32> {
    let ss = read_serial_struct(fd)?;
    u32::try_from(ss.baud_base).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("driver reports negative baud_base {}", ss.baud_base),
        )
    })
}

/// Programs `divisor` and switches the line to the custom speed.
pub fn set_custom_divisor<F: AsRawFd>(fd: &F, divisor: u32) -> io::Result<()> {
    let mut ss = read_serial_struct(fd)?;
    ss.flags = (ss.flags & !ASYNC_SPD_MASK) | ASYNC_SPD_CUST;
    ss.custom_divisor = c_int::try_from(divisor)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "divisor out of range"))?;
    // SAFETY: `ss` is a fully initialised `serial_struct` read back from the driver.
    unsafe { tiocsserial(fd.as_raw_fd(), &ss) }?;
    Ok(())
}
