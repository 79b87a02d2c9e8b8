use fdip_core::common::CoreId;
use fdip_core::core::op::{CfType, MemType, OpHandle, OpPool};

/// Fluent constructor for ops allocated straight into a pool.
///
/// Defaults to a complete 4-byte single-uop macro-op on core 0.
pub struct OpBuilder {
    core: CoreId,
    addr: u64,
    size: u64,
    bom: bool,
    eom: bool,
    cf_type: Option<CfType>,
    bar_fetch: bool,
    mem_type: MemType,
    mem_addrs: Vec<u64>,
    op_num: u64,
    inst_uid: u64,
}

impl OpBuilder {
    pub fn new(addr: u64) -> Self {
        Self {
            core: CoreId(0),
            addr,
            size: 4,
            bom: true,
            eom: true,
            cf_type: None,
            bar_fetch: false,
            mem_type: MemType::None,
            mem_addrs: Vec::new(),
            op_num: 0,
            inst_uid: 0,
        }
    }

    pub fn core(mut self, core: CoreId) -> Self {
        self.core = core;
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Marks the op as one micro-op of a macro-op.
    pub fn uop(mut self, bom: bool, eom: bool) -> Self {
        self.bom = bom;
        self.eom = eom;
        self
    }

    pub fn cf(mut self, cf_type: CfType) -> Self {
        self.cf_type = Some(cf_type);
        self
    }

    pub fn bar_fetch(mut self) -> Self {
        self.bar_fetch = true;
        self
    }

    pub fn mem(mut self, mem_type: MemType, addrs: &[u64]) -> Self {
        self.mem_type = mem_type;
        self.mem_addrs = addrs.to_vec();
        self
    }

    pub fn op_num(mut self, op_num: u64) -> Self {
        self.op_num = op_num;
        self
    }

    pub fn inst_uid(mut self, inst_uid: u64) -> Self {
        self.inst_uid = inst_uid;
        self
    }

    pub fn alloc(self, pool: &mut OpPool) -> OpHandle {
        let handle = pool.alloc(self.core);
        let op = &mut pool[handle];
        op.addr = self.addr;
        op.size = self.size;
        op.bom = self.bom;
        op.eom = self.eom;
        op.cf_type = self.cf_type;
        op.bar_fetch = self.bar_fetch;
        op.mem_type = self.mem_type;
        op.mem_addrs = self.mem_addrs;
        op.op_num = self.op_num;
        op.inst_uid = self.inst_uid;
        handle
    }
}
