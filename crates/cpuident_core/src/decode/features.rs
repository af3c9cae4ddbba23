//! Feature flag tables.
//! 
//! Every table only lists documented bits, anything else is masked out when decoding.
//! Names follow the names used by the Linux kernel in `/proc/cpuinfo` where one exists.

use serde::{ser::SerializeMap, Serialize, Serializer};

use cpuident_macros::flags;

use crate::RawLeafResult;

/// Basic feature flags.
/// 
/// Layout: cpuid(eax=1).ecx << 32 | cpuid(eax=1).edx
#[flags(u64)]
pub enum FeatureFlags {
    // cpuid(eax=1).edx
    /// Onboard x87 FPU.
    #[parse_name("fpu")]
    FPU,
    /// Virtual 8086 mode extensions (such as VIF, VIP, and PVI).
    #[parse_name("vme")]
    VME,
    /// Debugging Extensions (`CR4` bit 3).
    #[parse_name("de")]
    DE,
    /// Page Size Extensions (4MiB pages).
    #[parse_name("pse")]
    PSE,
    /// Time Stamp Counter.
    #[parse_name("tsc")]
    TSC,
    /// Model-specific registers and `RDMSR`/`WRMSR` instructions.
    #[parse_name("msr")]
    MSR,
    /// Physical Address Extension.
    #[parse_name("pae")]
    PAE,
    /// Machine Check Exception.
    #[parse_name("mce")]
    MCE,
    /// `CMPXCHG8B` (compare-and-swap) instruction.
    #[parse_name("cx8")]
    CX8,
    /// Onboard Advanced Programmable Interrupt Controller.
    #[parse_name("apic")]
    APIC,
    /// `SYSENTER` and `SYSEXIT` fast system call instructions.
    #[parse_name("sep")]
    SEP = 0x800,
    /// Memory Type Range Registers.
    #[parse_name("mtrr")]
    MTRR,
    /// Page Global Enable bit in `CR4`.
    #[parse_name("pge")]
    PGE,
    /// Machine Check Architecture.
    #[parse_name("mca")]
    MCA,
    /// Conditional move `CMOV`, `FCMOV`, and `FCOMI` instructions.
    #[parse_name("cmov")]
    CMOV,
    /// Page Attribute Table.
    #[parse_name("pat")]
    PAT,
    /// 36-bit Page Size Extension.
    #[parse_name("pse36")]
    PSE36,
    /// Processor Serial Number.
    #[parse_name("psn")]
    PSN,
    /// `CLFLUSH` cache line flush instruction.
    #[parse_name("clfsh")]
    CLFSH,
    /// Debug store: save trace of executed jumps.
    #[parse_name("ds")]
    DS = 0x20_0000,
    /// Onboard thermal control MSRs for ACPI.
    #[parse_name("acpi")]
    ACPI,
    /// MMX instructions.
    #[parse_name("mmx")]
    MMX,
    /// `FXSAVE` and `FXRSTOR` instructions.
    #[parse_name("fxsr")]
    FXSR,
    /// Streaming SIMD Extensions.
    #[parse_name("sse")]
    SSE,
    /// SSE2 instructions.
    #[parse_name("sse2")]
    SSE2,
    /// CPU cache implements self-snoop.
    #[parse_name("ss")]
    SS,
    /// Max APIC IDs reserved field is valid.
    #[parse_name("htt")]
    HTT,
    /// Thermal monitor automatically limits temperature.
    #[parse_name("tm")]
    TM,
    /// IA64 processor emulating x86.
    #[parse_name("ia64")]
    IA64,
    /// Pending Break Enable (PBE# pin) wakeup capability.
    #[parse_name("pbe")]
    PBE,

    // cpuid(eax=1).ecx
    /// SSE3 (Prescott New Instructions).
    #[parse_name("sse3")]
    SSE3,
    /// `PCLMULQDQ` (carry-less multiply) instruction.
    #[parse_name("pclmulqdq")]
    PCLMULQDQ,
    /// 64-bit debug store.
    #[parse_name("dtes64")]
    DTES64,
    /// `MONITOR` and `MWAIT` instructions.
    #[parse_name("monitor")]
    Monitor,
    /// CPL qualified debug store.
    #[parse_name("ds_cpl")]
    DS_CPL,
    /// Virtual Machine eXtensions.
    #[parse_name("vmx")]
    VMX,
    /// Safer Mode eXtensions (`GETSEC` instruction).
    #[parse_name("smx")]
    SMX,
    /// Enhanced SpeedStep.
    #[parse_name("est")]
    EST,
    /// Thermal Monitor 2.
    #[parse_name("tm2")]
    TM2,
    /// Supplemental SSE3 instructions.
    #[parse_name("ssse3")]
    SSSE3,
    /// L1 Context ID.
    #[parse_name("cnxt_id")]
    CnxtId,
    /// Silicon Debug Interface.
    #[parse_name("sdbg")]
    SDBG,
    /// Fused Multiply-Add (FMA3).
    #[parse_name("fma")]
    FMA,
    /// `CMPXCHG16B` instruction.
    #[parse_name("cx16")]
    CX16,
    /// Can disable sending task priority messages.
    #[parse_name("xtpr")]
    XTPR,
    /// Perfmon and debug capability.
    #[parse_name("pdcm")]
    PDCM,
    /// Process context identifiers (`CR4` bit 17).
    #[parse_name("pcid")]
    PCID = 0x2_0000_0000_0000,
    /// Direct Cache Access for DMA writes.
    #[parse_name("dca")]
    DCA,
    /// SSE4.1 instructions.
    #[parse_name("sse4_1")]
    SSE4_1,
    /// SSE4.2 instructions.
    #[parse_name("sse4_2")]
    SSE4_2,
    /// x2APIC.
    #[parse_name("x2apic")]
    X2APIC,
    /// `MOVBE` instruction (big-endian).
    #[parse_name("movbe")]
    MOVBE,
    /// `POPCNT` instruction.
    #[parse_name("popcnt")]
    POPCNT,
    /// APIC implements one-shot operation using a TSC deadline value.
    #[parse_name("tsc_deadline")]
    TscDeadline,
    /// AES instruction set.
    #[parse_name("aes")]
    AES,
    /// `XSAVE`, `XRSTOR`, `XSETBV`, and `XGETBV` instructions.
    #[parse_name("xsave")]
    XSAVE,
    /// `XSAVE` enabled by the OS.
    #[parse_name("osxsave")]
    OSXSAVE,
    /// Advanced Vector Extensions.
    #[parse_name("avx")]
    AVX,
    /// Half-precision float conversion instructions.
    #[parse_name("f16c")]
    F16C,
    /// `RDRAND` instruction.
    #[parse_name("rdrand")]
    RDRAND,
    /// Running under a hypervisor (always zero on physical CPUs).
    #[parse_name("hypervisor")]
    Hypervisor,
}

/// Structured extended feature flags.
/// 
/// Layout: cpuid(eax=7,ecx=0).edx << 64 | cpuid(eax=7,ecx=0).ecx << 32 | cpuid(eax=7,ecx=0).ebx
#[flags(u128)]
pub enum ExtendedFeatureFlags {
    // cpuid(eax=7,ecx=0).ebx
    /// Access to base %fs and %gs.
    #[parse_name("fsgsbase")]
    FsGsBase,
    /// `IA32_TSC_ADJUST` MSR.
    #[parse_name("tsc_adjust")]
    TscAdjust,
    /// Software Guard Extensions.
    #[parse_name("sgx")]
    SGX,
    /// Bit Manipulation Instruction set 1.
    #[parse_name("bmi1")]
    BMI1,
    /// TSX Hardware Lock Elision.
    #[parse_name("hle")]
    HLE,
    /// Advanced Vector Extensions 2.
    #[parse_name("avx2")]
    AVX2,
    /// x87 FPU data pointer register updated on exceptions only.
    #[parse_name("fdp_excptn_only")]
    FdpExcptnOnly,
    /// Supervisor Mode Execution Prevention.
    #[parse_name("smep")]
    SMEP,
    /// Bit Manipulation Instruction set 2.
    #[parse_name("bmi2")]
    BMI2,
    /// Enhanced `REP MOVSB/STOSB`.
    #[parse_name("erms")]
    ERMS,
    /// `INVPCID` instruction.
    #[parse_name("invpcid")]
    INVPCID,
    /// TSX Restricted Transactional Memory.
    #[parse_name("rtm")]
    RTM,
    /// Intel RDT Monitoring or AMD Platform QoS Monitoring.
    #[parse_name("pqm")]
    PQM,
    /// x87 FPU CS and DS deprecated.
    #[parse_name("zero_fcs_fds")]
    ZeroFcsFds,
    /// Intel MPX (Memory Protection Extensions).
    #[parse_name("mpx")]
    MPX,
    /// Intel RDT Allocation or AMD Platform QoS Enforcement.
    #[parse_name("pqe")]
    PQE,
    /// AVX-512 Foundation.
    #[parse_name("avx512f")]
    AVX512F,
    /// AVX-512 Doubleword and Quadword instructions.
    #[parse_name("avx512dq")]
    AVX512DQ,
    /// `RDSEED` instruction.
    #[parse_name("rdseed")]
    RDSEED,
    /// Multi-precision Add-Carry instruction eXtensions.
    #[parse_name("adx")]
    ADX,
    /// Supervisor Mode Access Prevention.
    #[parse_name("smap")]
    SMAP,
    /// AVX-512 Integer Fused Multiply-Add.
    #[parse_name("avx512ifma")]
    AVX512IFMA,
    /// `PCOMMIT` instruction (deprecated).
    #[parse_name("pcommit")]
    PCOMMIT,
    /// `CLFLUSHOPT` instruction.
    #[parse_name("clflushopt")]
    ClFlushOpt,
    /// `CLWB` instruction.
    #[parse_name("clwb")]
    CLWB,
    /// Intel Processor Trace.
    #[parse_name("intel_pt")]
    PT,
    /// AVX-512 Prefetch instructions.
    #[parse_name("avx512pf")]
    AVX512PF,
    /// AVX-512 Exponential and Reciprocal instructions.
    #[parse_name("avx512er")]
    AVX512ER,
    /// AVX-512 Conflict Detection instructions.
    #[parse_name("avx512cd")]
    AVX512CD,
    /// SHA-1 and SHA-256 extensions.
    #[parse_name("sha_ni")]
    SHA,
    /// AVX-512 Byte and Word instructions.
    #[parse_name("avx512bw")]
    AVX512BW,
    /// AVX-512 Vector Length extensions.
    #[parse_name("avx512vl")]
    AVX512VL,

    // cpuid(eax=7,ecx=0).ecx
    /// `PREFETCHWT1` instruction.
    #[parse_name("prefetchwt1")]
    PrefetchWT1,
    /// AVX-512 Vector Bit Manipulation Instructions.
    #[parse_name("avx512vbmi")]
    AVX512VBMI,
    /// User-Mode Instruction Prevention.
    #[parse_name("umip")]
    UMIP,
    /// Memory Protection Keys for User-mode pages.
    #[parse_name("pku")]
    PKU,
    /// PKU enabled by the OS.
    #[parse_name("ospke")]
    OSPKE,
    /// `TPAUSE`, `UMONITOR` and `UMWAIT` instructions.
    #[parse_name("waitpkg")]
    WaitPkg,
    /// AVX-512 Vector Bit Manipulation Instructions 2.
    #[parse_name("avx512_vbmi2")]
    AVX512VBMI2,
    /// Control flow enforcement: shadow stack.
    #[parse_name("cet_ss")]
    CetSs,
    /// Galois Field instructions.
    #[parse_name("gfni")]
    GFNI,
    /// Vector AES instructions.
    #[parse_name("vaes")]
    VAES,
    /// Vector `PCLMULQDQ` instructions.
    #[parse_name("vpclmulqdq")]
    VPCLMULQDQ,
    /// AVX-512 Vector Neural Network Instructions.
    #[parse_name("avx512_vnni")]
    AVX512VNNI,
    /// AVX-512 `BITALG` instructions.
    #[parse_name("avx512_bitalg")]
    AVX512BITALG,
    /// Total Memory Encryption MSRs.
    #[parse_name("tme")]
    TME,
    /// AVX-512 Vector Population Count Double and Quad-word.
    #[parse_name("avx512_vpopcntdq")]
    AVX512VPOPCNTDQ,
    /// 5-level paging (57 address bits).
    #[parse_name("la57")]
    LA57 = 0x1_0000_0000_0000,
    /// `RDPID` instruction and `IA32_TSC_AUX` MSR.
    #[parse_name("rdpid")]
    RDPID = 0x40_0000_0000_0000,
    /// AES Key Locker.
    #[parse_name("kl")]
    KL,
    /// Bus lock debug exceptions.
    #[parse_name("bus_lock_detect")]
    BusLockDetect,
    /// `CLDEMOTE` instruction.
    #[parse_name("cldemote")]
    CLDEMOTE,
    /// `MOVDIRI` instruction.
    #[parse_name("movdiri")]
    MOVDIRI = 0x800_0000_0000_0000,
    /// `MOVDIR64B` instruction.
    #[parse_name("movdir64b")]
    MOVDIR64B,
    /// Enqueue stores and `ENQCMD`/`ENQCMDS` instructions.
    #[parse_name("enqcmd")]
    ENQCMD,
    /// SGX Launch Configuration.
    #[parse_name("sgx_lc")]
    SGX_LC,
    /// Protection Keys for Supervisor-mode pages.
    #[parse_name("pks")]
    PKS,

    // cpuid(eax=7,ecx=0).edx
    /// Attestation Services for Intel SGX.
    #[parse_name("sgx_keys")]
    SGX_KEYS = 0x2_0000_0000_0000_0000,
    /// AVX-512 4-register Neural Network Instructions.
    #[parse_name("avx512_4vnniw")]
    AVX512_4VNNIW,
    /// AVX-512 4-register Multiply Accumulation Single Precision.
    #[parse_name("avx512_4fmaps")]
    AVX512_4FMAPS,
    /// Fast Short `REP MOVSB`.
    #[parse_name("fsrm")]
    FSRM,
    /// User Inter-processor Interrupts.
    #[parse_name("uintr")]
    UINTR,
    /// AVX-512 vector intersection instructions.
    #[parse_name("avx512_vp2intersect")]
    AVX512_VP2INTERSECT = 0x100_0000_0000_0000_0000,
    /// Special Register Buffer Data Sampling mitigations.
    #[parse_name("srbds_ctrl")]
    SRBDS_CTRL,
    /// `VERW` instruction clears CPU buffers.
    #[parse_name("md_clear")]
    MD_CLEAR,
    /// All TSX transactions are aborted.
    #[parse_name("rtm_always_abort")]
    RTM_ALWAYS_ABORT,
    /// `TSX_FORCE_ABORT` MSR.
    #[parse_name("tsx_force_abort")]
    TSX_FORCE_ABORT = 0x2000_0000_0000_0000_0000,
    /// `SERIALIZE` instruction.
    #[parse_name("serialize")]
    Serialize,
    /// Mixture of CPU types in the processor topology.
    #[parse_name("hybrid")]
    Hybrid,
    /// TSX suspend load address tracking instructions.
    #[parse_name("tsxldtrk")]
    TSXLDTRK,
    /// Platform configuration (Memory Encryption Technologies Instructions).
    #[parse_name("pconfig")]
    PCONFIG = 0x4_0000_0000_0000_0000_0000,
    /// Architectural Last Branch Records.
    #[parse_name("arch_lbr")]
    ArchLBR,
    /// Control flow enforcement: indirect branch tracking.
    #[parse_name("ibt")]
    IBT,
    /// AMX tile computation on bfloat16 numbers.
    #[parse_name("amx_bf16")]
    AMX_BF16 = 0x40_0000_0000_0000_0000_0000,
    /// AVX-512 half-precision arithmetic instructions.
    #[parse_name("avx512_fp16")]
    AVX512_FP16,
    /// AMX tile load/store instructions.
    #[parse_name("amx_tile")]
    AMX_TILE,
    /// AMX tile computation on 8-bit integers.
    #[parse_name("amx_int8")]
    AMX_INT8,
    /// Indirect Branch Restricted Speculation and Indirect Branch Prediction Barrier.
    #[parse_name("spec_ctrl")]
    SpecCtrl,
    /// Single Thread Indirect Branch Predictor.
    #[parse_name("stibp")]
    STIBP,
    /// `IA32_FLUSH_CMD` MSR.
    #[parse_name("flush_l1d")]
    FlushL1d,
    /// `IA32_ARCH_CAPABILITIES` MSR.
    #[parse_name("arch_capabilities")]
    ArchCapabilities,
    /// `IA32_CORE_CAPABILITIES` MSR.
    #[parse_name("core_capabilities")]
    CoreCapabilities,
    /// Speculative Store Bypass Disable.
    #[parse_name("ssbd")]
    SSBD,
}

/// Structured extended feature flags, sub-leaf 1.
/// 
/// Layout: cpuid(eax=7,ecx=1).eax
#[flags(u32)]
pub enum ExtendedFeatureFlags1 {
    /// SHA-512 extensions.
    #[parse_name("sha512")]
    SHA512,
    /// SM3 hash extensions.
    #[parse_name("sm3")]
    SM3,
    /// SM4 cipher extensions.
    #[parse_name("sm4")]
    SM4,
    /// Remote atomic operations on integers.
    #[parse_name("rao_int")]
    RaoInt,
    /// AVX Vector Neural Network Instructions (VEX encoded).
    #[parse_name("avx_vnni")]
    AvxVnni,
    /// AVX-512 instructions for bfloat16 numbers.
    #[parse_name("avx512_bf16")]
    AVX512_BF16,
    /// Linear Address Space Separation.
    #[parse_name("lass")]
    LASS,
    /// `CMPccXADD` instructions.
    #[parse_name("cmpccxadd")]
    CMPCCXADD,
    /// Architectural performance monitoring extended leaf (EAX=23h).
    #[parse_name("arch_perfmon_ext")]
    ArchPerfMonExt,
    /// Fast zero-length `REP MOVSB`.
    #[parse_name("fzrm")]
    FZRM = 0x400,
    /// Fast short `REP STOSB`.
    #[parse_name("fsrs")]
    FSRS,
    /// Fast short `REP CMPSB` and `REP SCASB`.
    #[parse_name("fsrc")]
    FSRC,
    /// Flexible Return and Event Delivery.
    #[parse_name("fred")]
    FRED = 0x2_0000,
    /// `LKGS` instruction.
    #[parse_name("lkgs")]
    LKGS,
    /// `WRMSRNS` instruction.
    #[parse_name("wrmsrns")]
    WRMSRNS,
    /// AMX instructions for FP16 numbers.
    #[parse_name("amx_fp16")]
    AMX_FP16 = 0x20_0000,
    /// `HRESET` instruction and history reset leaf.
    #[parse_name("hreset")]
    HRESET,
    /// AVX integer fused multiply-add instructions.
    #[parse_name("avx_ifma")]
    AvxIfma,
    /// Linear Address Masking.
    #[parse_name("lam")]
    LAM = 0x400_0000,
    /// `RDMSRLIST` and `WRMSRLIST` instructions.
    #[parse_name("msrlist")]
    MsrList,
}

/// Extended processor feature flags.
/// 
/// Layout: cpuid(eax=80000001h).ecx << 32 | cpuid(eax=80000001h).edx
/// 
/// EDX bits that duplicate [`FeatureFlags`] are not part of this set.
#[flags(u64)]
pub enum ExtProcessorFeatureFlags {
    // cpuid(eax=80000001h).edx
    /// `SYSCALL` and `SYSRET` instructions.
    #[parse_name("syscall")]
    Syscall = 0x800,
    /// Multiprocessor capable.
    #[parse_name("mp")]
    MP = 0x8_0000,
    /// No-execute bit.
    #[parse_name("nx")]
    NX,
    /// Extended MMX.
    #[parse_name("mmxext")]
    MmxExt = 0x40_0000,
    /// `FXSAVE` and `FXRSTOR` optimizations.
    #[parse_name("fxsr_opt")]
    FxsrOpt = 0x200_0000,
    /// Gigabyte pages.
    #[parse_name("pdpe1gb")]
    PDPE1GB,
    /// `RDTSCP` instruction.
    #[parse_name("rdtscp")]
    RDTSCP,
    /// Long mode (x86-64).
    #[parse_name("lm")]
    LM = 0x2000_0000,
    /// Extended 3DNow!
    #[parse_name("3dnowext")]
    _3DNowExt,
    /// 3DNow!
    #[parse_name("3dnow")]
    _3DNow,

    // cpuid(eax=80000001h).ecx
    /// `LAHF`/`SAHF` in long mode.
    #[parse_name("lahf_lm")]
    LahfLm,
    /// Hyperthreading not valid.
    #[parse_name("cmp_legacy")]
    CmpLegacy,
    /// Secure Virtual Machine.
    #[parse_name("svm")]
    SVM,
    /// Extended APIC space.
    #[parse_name("extapic")]
    ExtApic,
    /// `CR8` in 32-bit mode.
    #[parse_name("cr8_legacy")]
    Cr8Legacy,
    /// Advanced bit manipulation (`LZCNT` and `POPCNT`).
    #[parse_name("abm")]
    ABM,
    /// SSE4a.
    #[parse_name("sse4a")]
    SSE4a,
    /// Misaligned SSE mode.
    #[parse_name("misalignsse")]
    MisalignSse,
    /// `PREFETCH` and `PREFETCHW` instructions.
    #[parse_name("3dnowprefetch")]
    _3DNowPrefetch,
    /// OS Visible Workaround.
    #[parse_name("osvw")]
    OSVW,
    /// Instruction Based Sampling.
    #[parse_name("ibs")]
    IBS,
    /// XOP instruction set.
    #[parse_name("xop")]
    XOP,
    /// `SKINIT` and `STGI` instructions.
    #[parse_name("skinit")]
    SKINIT,
    /// Watchdog timer.
    #[parse_name("wdt")]
    WDT,
    /// Light Weight Profiling.
    #[parse_name("lwp")]
    LWP = 0x8000_0000_0000,
    /// 4-operand fused multiply-add.
    #[parse_name("fma4")]
    FMA4,
    /// Translation Cache Extension.
    #[parse_name("tce")]
    TCE,
    /// NodeID MSR.
    #[parse_name("nodeid_msr")]
    NodeIdMsr = 0x8_0000_0000_0000,
    /// Trailing Bit Manipulation.
    #[parse_name("tbm")]
    TBM = 0x20_0000_0000_0000,
    /// Topology extensions (leaf 8000001Dh and 8000001Eh).
    #[parse_name("topoext")]
    TopoExt,
    /// Core performance counter extensions.
    #[parse_name("perfctr_core")]
    PerfCtrCore,
    /// Northbridge performance counter extensions.
    #[parse_name("perfctr_nb")]
    PerfCtrNb,
    /// Data breakpoint extensions.
    #[parse_name("bpext")]
    DBX = 0x400_0000_0000_0000,
    /// Performance timestamp counter.
    #[parse_name("ptsc")]
    PerfTsc,
    /// L2i performance counter extensions.
    #[parse_name("perfctr_llc")]
    PcxL2i,
    /// `MONITORX` and `MWAITX` instructions.
    #[parse_name("mwaitx")]
    MonitorX,
    /// Address mask extension for instruction breakpoints.
    #[parse_name("addr_mask_ext")]
    AddrMaskExt,
}

/// Advanced power management flags.
/// 
/// Layout: cpuid(eax=80000007h).edx
#[flags(u32)]
pub enum PowerManagementFlags {
    /// Temperature sensor.
    #[parse_name("ts")]
    TS,
    /// Frequency ID control.
    #[parse_name("fid")]
    FID,
    /// Voltage ID control.
    #[parse_name("vid")]
    VID,
    /// THERMTRIP.
    #[parse_name("ttp")]
    TTP,
    /// Hardware thermal control.
    #[parse_name("tm")]
    TM,
    /// Software thermal control.
    #[parse_name("stc")]
    STC,
    /// 100 MHz multiplier control.
    #[parse_name("100mhzsteps")]
    Steps100Mhz,
    /// Hardware P-state control.
    #[parse_name("hwpstate")]
    HwPState,
    /// TSC rate is invariant across P-, C- and T-states.
    #[parse_name("constant_tsc")]
    ConstantTsc,
    /// Core performance boost.
    #[parse_name("cpb")]
    CPB,
    /// Read-only effective frequency interface.
    #[parse_name("eff_freq_ro")]
    EffFreqRo,
    /// Processor feedback interface.
    #[parse_name("proc_feedback")]
    ProcFeedback,
    /// Processor power reporting interface.
    #[parse_name("acc_power")]
    AccPower,
}

/// Everything reported by leaf 7.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ExtendedFeatureBlock {
    /// Highest sub-leaf of leaf 7 (sub-leaf 0 EAX).
    pub max_subleaf: u32,
    /// Sub-leaf 0 flags.
    pub flags:       ExtendedFeatureFlags,
    /// Sub-leaf 1 flags, empty when sub-leaf 1 is not reported.
    pub flags1:      ExtendedFeatureFlags1,
}

impl ExtendedFeatureBlock {
    /// Iterate over the flags of all sub-leaves, with their state.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, bool)> {
        self.flags.iter_named().chain(self.flags1.iter_named())
    }

    /// Look up a flag of any sub-leaf by name.
    pub fn get_named(&self, name: &str) -> Option<bool> {
        self.flags.get_named(name).or_else(|| self.flags1.get_named(name))
    }
}

/// Decode the basic feature flags from leaf 1.
pub fn decode_features(leaf1: RawLeafResult) -> FeatureFlags {
    FeatureFlags::from_bits_truncate((leaf1.ecx as u64) << 32 | leaf1.edx as u64)
}

/// Decode the sub-leaf 0 part of leaf 7, sub-leaf 1 flags are left empty.
pub fn decode_extended_features(leaf7_sub0: RawLeafResult) -> ExtendedFeatureBlock {
    let bits = (leaf7_sub0.edx as u128) << 64 | (leaf7_sub0.ecx as u128) << 32 | leaf7_sub0.ebx as u128;
    ExtendedFeatureBlock {
        max_subleaf: leaf7_sub0.eax,
        flags: ExtendedFeatureFlags::from_bits_truncate(bits),
        flags1: ExtendedFeatureFlags1::None,
    }
}

pub fn decode_extended_features_sub1(leaf7_sub1: RawLeafResult) -> ExtendedFeatureFlags1 {
    ExtendedFeatureFlags1::from_bits_truncate(leaf7_sub1.eax)
}

pub fn decode_ext_processor_features(leaf_8000_0001: RawLeafResult) -> ExtProcessorFeatureFlags {
    ExtProcessorFeatureFlags::from_bits_truncate((leaf_8000_0001.ecx as u64) << 32 | leaf_8000_0001.edx as u64)
}

pub fn decode_power_management(leaf_8000_0007: RawLeafResult) -> PowerManagementFlags {
    PowerManagementFlags::from_bits_truncate(leaf_8000_0007.edx)
}

/// Serialize `(name, set)` pairs as a map.
fn serialize_named<S, I>(named: I, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: Iterator<Item = (&'static str, bool)>,
{
    let mut map = serializer.serialize_map(None)?;
    for (name, set) in named {
        map.serialize_entry(name, &set)?;
    }
    map.end()
}

macro_rules! impl_serialize_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serialize_named(self.iter_named(), serializer)
                }
            }
        )*
    };
}

impl_serialize_named!(
    FeatureFlags,
    ExtendedFeatureFlags,
    ExtendedFeatureFlags1,
    ExtProcessorFeatureFlags,
    PowerManagementFlags,
    ExtendedFeatureBlock,
);

#[cfg(test)]
mod test {
    use crate::RawLeafResult;
    use super::*;

    #[test]
    fn leaf1_names() {
        // fpu, sse, sse2 in edx; sse3, sse4_1, avx in ecx
        let flags = decode_features(RawLeafResult::new(0, 0, 0x1008_0001, 0x0600_0001));
        assert!(flags.contains(FeatureFlags::FPU));
        assert_eq!(flags.get_named("fpu"), Some(true));
        assert_eq!(flags.get_named("sse"), Some(true));
        assert_eq!(flags.get_named("sse2"), Some(true));
        assert_eq!(flags.get_named("sse3"), Some(true));
        assert_eq!(flags.get_named("sse4_1"), Some(true));
        assert_eq!(flags.get_named("avx"), Some(true));
        assert_eq!(flags.get_named("sse4_2"), Some(false));
        assert_eq!(flags.get_named("not_a_flag"), None);
        assert_eq!(flags.iter_set().collect::<Vec<_>>(), ["fpu", "sse", "sse2", "sse3", "sse4_1", "avx"]);
    }

    #[test]
    fn reserved_bits_are_ignored() {
        // edx bits 10 and 20, ecx bit 16
        let flags = decode_features(RawLeafResult::new(0, 0, 0x0001_0000, 0x0010_0400));
        assert!(flags.is_none());

        let flags = decode_ext_processor_features(RawLeafResult::new(0, 0, 0x8000_0000, 0x0000_0001));
        assert!(flags.is_none());
    }

    /// Setting a single documented bit sets exactly the flag with that bit.
    fn check_single_bits<T: Copy>(named: &[(&'static str, T)], bits: impl Fn(T) -> u128, decode: impl Fn(u128) -> Vec<(&'static str, bool)>) {
        for &(name, flag) in named {
            let flag_bits = bits(flag);
            assert_eq!(flag_bits.count_ones(), 1, "{name} is not a single bit");
            for (other, set) in decode(flag_bits) {
                assert_eq!(set, other == name, "toggling {name} changed {other}");
            }
        }
    }

    #[test]
    fn feature_flags_are_independent() {
        check_single_bits(FeatureFlags::NAMED, |flag| flag.bits() as u128, |bits| {
            decode_features(RawLeafResult::new(0, 0, (bits >> 32) as u32, bits as u32)).iter_named().collect()
        });
    }

    #[test]
    fn extended_feature_flags_are_independent() {
        check_single_bits(ExtendedFeatureFlags::NAMED, |flag| flag.bits(), |bits| {
            decode_extended_features(RawLeafResult::new(0, bits as u32, (bits >> 32) as u32, (bits >> 64) as u32)).iter_named().collect()
        });
        check_single_bits(ExtendedFeatureFlags1::NAMED, |flag| flag.bits() as u128, |bits| {
            decode_extended_features_sub1(RawLeafResult::new(bits as u32, 0, 0, 0)).iter_named().collect()
        });
    }

    #[test]
    fn ext_processor_flags_are_independent() {
        check_single_bits(ExtProcessorFeatureFlags::NAMED, |flag| flag.bits() as u128, |bits| {
            decode_ext_processor_features(RawLeafResult::new(0, 0, (bits >> 32) as u32, bits as u32)).iter_named().collect()
        });
        check_single_bits(PowerManagementFlags::NAMED, |flag| flag.bits() as u128, |bits| {
            decode_power_management(RawLeafResult::new(0, 0, 0, bits as u32)).iter_named().collect()
        });
    }

    #[test]
    fn flag_positions() {
        assert_eq!(FeatureFlags::SEP.bits(), 1 << 11);
        assert_eq!(FeatureFlags::DS.bits(), 1 << 21);
        assert_eq!(FeatureFlags::PBE.bits(), 1 << 31);
        assert_eq!(FeatureFlags::SSE3.bits(), 1 << 32);
        assert_eq!(FeatureFlags::PCID.bits(), 1 << 49);
        assert_eq!(FeatureFlags::Hypervisor.bits(), 1 << 63);

        assert_eq!(ExtendedFeatureFlags::AVX2.bits(), 1 << 5);
        assert_eq!(ExtendedFeatureFlags::AVX512VL.bits(), 1 << 31);
        assert_eq!(ExtendedFeatureFlags::LA57.bits(), 1 << (32 + 16));
        assert_eq!(ExtendedFeatureFlags::PKS.bits(), 1 << (32 + 31));
        assert_eq!(ExtendedFeatureFlags::SGX_KEYS.bits(), 1 << (64 + 1));
        assert_eq!(ExtendedFeatureFlags::TSXLDTRK.bits(), 1 << (64 + 16));
        assert_eq!(ExtendedFeatureFlags::IBT.bits(), 1 << (64 + 20));
        assert_eq!(ExtendedFeatureFlags::SSBD.bits(), 1 << (64 + 31));

        assert_eq!(ExtendedFeatureFlags1::MsrList.bits(), 1 << 27);

        assert_eq!(ExtProcessorFeatureFlags::_3DNow.bits(), 1 << 31);
        assert_eq!(ExtProcessorFeatureFlags::WDT.bits(), 1 << (32 + 13));
        assert_eq!(ExtProcessorFeatureFlags::TopoExt.bits(), 1 << (32 + 22));
        assert_eq!(ExtProcessorFeatureFlags::AddrMaskExt.bits(), 1 << (32 + 30));

        assert_eq!(PowerManagementFlags::ConstantTsc.bits(), 1 << 8);
        assert_eq!(PowerManagementFlags::AccPower.bits(), 1 << 12);
    }

    #[test]
    fn leaf7_registers() {
        let block = decode_extended_features(RawLeafResult::new(2, 1 << 5, 1 << 16, 1 << 4));
        assert_eq!(block.max_subleaf, 2);
        assert!(block.flags.contains(ExtendedFeatureFlags::AVX2 | ExtendedFeatureFlags::LA57 | ExtendedFeatureFlags::FSRM));
        assert!(block.flags1.is_none());
        assert_eq!(block.get_named("fsrm"), Some(true));
        assert_eq!(block.get_named("avx_vnni"), Some(false));
    }

    #[test]
    fn power_management_names() {
        let flags = decode_power_management(RawLeafResult::new(0, 0, 0, 0x0000_0140));
        assert_eq!(flags.to_string(), "100mhzsteps constant_tsc");
    }
}
