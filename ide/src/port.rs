#[cfg(target_arch = "x86_64")]
use x86_64::instructions::{interrupts, port::Port};

/// 端口 I/O 接口，驱动对控制器的全部访问都经此进行
pub trait PortIo: Send {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);
    /// 从 `port` 以双字为单位读满 `buf`，长度须为 4 的倍数
    fn insl(&mut self, port: u16, buf: &mut [u8]);
    /// 将 `buf` 以双字为单位写往 `port`，长度须为 4 的倍数
    fn outsl(&mut self, port: u16, buf: &[u8]);

    /// 屏蔽本核中断执行 `f`，返回时恢复原先的中断状态
    fn without_interrupts<R>(f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        f()
    }
}

/// x86 的 in/out 指令
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct Pio(());

#[cfg(target_arch = "x86_64")]
impl Pio {
    /// # Safety
    ///
    /// 调用方须确保处于可执行端口 I/O 的特权级，且主 IDE 通道只有这一个使用者。
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for Pio {
    fn inb(&mut self, port: u16) -> u8 {
        let mut port: Port<u8> = Port::new(port);
        // SAFETY: 构造 Pio 时已保证端口可访问
        unsafe { port.read() }
    }

    fn outb(&mut self, port: u16, value: u8) {
        let mut port: Port<u8> = Port::new(port);
        unsafe { port.write(value) }
    }

    fn insl(&mut self, port: u16, buf: &mut [u8]) {
        debug_assert_eq!(0, buf.len() % 4);
        let mut port: Port<u32> = Port::new(port);
        for dword in buf.chunks_exact_mut(4) {
            dword.copy_from_slice(&unsafe { port.read() }.to_le_bytes());
        }
    }

    fn outsl(&mut self, port: u16, buf: &[u8]) {
        debug_assert_eq!(0, buf.len() % 4);
        let mut port: Port<u32> = Port::new(port);
        for dword in buf.chunks_exact(4) {
            let value = u32::from_le_bytes([dword[0], dword[1], dword[2], dword[3]]);
            unsafe { port.write(value) }
        }
    }

    fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
        interrupts::without_interrupts(f)
    }
}
