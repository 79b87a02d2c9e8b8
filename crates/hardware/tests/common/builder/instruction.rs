use fdip_core::core::op::{CfType, MemType};

/// One instruction of a scripted program.
///
/// `target` is the taken target of control flow; the instruction follows it
/// on the correct path when `taken` is set.
#[derive(Clone, Debug)]
pub struct Inst {
    pub addr: u64,
    pub size: u64,
    pub uops: usize,
    pub cf: Option<CfType>,
    pub target: u64,
    pub taken: bool,
    pub bar_fetch: bool,
    pub exit: bool,
    pub mem_type: MemType,
    pub mem_addrs: Vec<u64>,
}

impl Inst {
    /// A plain 4-byte single-uop instruction.
    pub fn alu(addr: u64) -> Self {
        Self {
            addr,
            size: 4,
            uops: 1,
            cf: None,
            target: 0,
            taken: false,
            bar_fetch: false,
            exit: false,
            mem_type: MemType::None,
            mem_addrs: Vec::new(),
        }
    }

    /// A conditional branch to `target`.
    pub fn branch(addr: u64, target: u64, taken: bool) -> Self {
        Self {
            cf: Some(CfType::Branch),
            target,
            taken,
            ..Self::alu(addr)
        }
    }

    /// An unconditional jump to `target`.
    pub fn jump(addr: u64, target: u64) -> Self {
        Self {
            cf: Some(CfType::Jump),
            target,
            taken: true,
            ..Self::alu(addr)
        }
    }

    /// A system call, falling through.
    pub fn syscall(addr: u64) -> Self {
        Self {
            cf: Some(CfType::Syscall),
            ..Self::alu(addr)
        }
    }

    /// A fetch barrier (fence), falling through.
    pub fn fence(addr: u64) -> Self {
        Self {
            bar_fetch: true,
            ..Self::alu(addr)
        }
    }

    /// The last instruction of the application.
    pub fn exit(addr: u64) -> Self {
        Self {
            exit: true,
            ..Self::alu(addr)
        }
    }

    /// A load from `ea`.
    pub fn load(addr: u64, ea: u64) -> Self {
        Self {
            mem_type: MemType::Load,
            mem_addrs: vec![ea],
            ..Self::alu(addr)
        }
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn uops(mut self, uops: usize) -> Self {
        self.uops = uops;
        self
    }

    /// Address of the next correct-path instruction.
    pub fn next_pc(&self) -> u64 {
        if self.cf.is_some() && self.taken {
            self.target
        } else {
            self.addr + self.size
        }
    }
}

/// `n` contiguous 4-byte instructions starting at `start`.
pub fn straight_line(start: u64, n: usize) -> Vec<Inst> {
    (0..n).map(|i| Inst::alu(start + 4 * i as u64)).collect()
}
