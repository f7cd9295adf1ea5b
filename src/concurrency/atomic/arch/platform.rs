//! The backend used by the rest of the crate.
//!
//! Picked from the target architecture unless one of the `backend-*` cargo
//! features forces a choice (`backend-fallback` wins over `backend-alpha`,
//! which wins over `backend-ppc`, which wins over `backend-generic-cas`).
//! Whatever the choice, the exported names and their operations are the same.

/// A backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Native `lock`-prefixed instructions.
    X86,
    /// `lwarx`/`stwcx.` with `lwsync`/`sync`.
    PowerPc,
    /// `ldl_l`/`stl_c` with `mb`.
    Alpha,
    /// A fully fenced CAS and nothing else.
    GenericCas,
    /// Address-hashed mutexes.
    Fallback,
}

impl Backend {
    /// Name used in benchmark reports and cargo features.
    pub const fn name(self) -> &'static str {
        match self {
            Backend::X86 => "x86",
            Backend::PowerPc => "ppc",
            Backend::Alpha => "alpha",
            Backend::GenericCas => "generic-cas",
            Backend::Fallback => "fallback",
        }
    }
}

impl core::fmt::Display for Backend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "backend-fallback")]
mod selected {
    use super::super::fallback::Integer;
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::Fallback;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Integer<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Integer<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

#[cfg(all(not(feature = "backend-fallback"), feature = "backend-alpha"))]
mod selected {
    use super::super::alpha::{Embedded, Integer};
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::Alpha;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Embedded<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Embedded<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    #[cfg(target_has_atomic = "64")]
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on an 8-byte word.
    #[cfg(not(target_has_atomic = "64"))]
    pub type Atomic64 = super::super::fallback::Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

#[cfg(all(
    not(any(feature = "backend-fallback", feature = "backend-alpha")),
    any(
        feature = "backend-ppc",
        all(
            not(feature = "backend-generic-cas"),
            any(target_arch = "powerpc", target_arch = "powerpc64")
        )
    )
))]
mod selected {
    use super::super::ppc::{Embedded, Integer};
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::PowerPc;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Embedded<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Embedded<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    #[cfg(target_has_atomic = "64")]
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on an 8-byte word.
    #[cfg(not(target_has_atomic = "64"))]
    pub type Atomic64 = super::super::fallback::Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

#[cfg(all(
    not(any(
        feature = "backend-fallback",
        feature = "backend-alpha",
        feature = "backend-ppc"
    )),
    any(
        feature = "backend-generic-cas",
        all(
            not(any(
                target_arch = "x86",
                target_arch = "x86_64",
                target_arch = "powerpc",
                target_arch = "powerpc64"
            )),
            target_has_atomic = "ptr"
        )
    )
))]
mod selected {
    use super::super::generic_cas::{Embedded, Integer};
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::GenericCas;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Embedded<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Embedded<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    #[cfg(target_has_atomic = "64")]
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on an 8-byte word.
    #[cfg(not(target_has_atomic = "64"))]
    pub type Atomic64 = super::super::fallback::Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

#[cfg(all(
    not(any(
        feature = "backend-fallback",
        feature = "backend-alpha",
        feature = "backend-ppc",
        feature = "backend-generic-cas"
    )),
    any(target_arch = "x86", target_arch = "x86_64")
))]
mod selected {
    use super::super::x86::Integer;
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::X86;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Integer<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Integer<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

#[cfg(all(
    not(any(
        feature = "backend-fallback",
        feature = "backend-alpha",
        feature = "backend-ppc",
        feature = "backend-generic-cas"
    )),
    not(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "powerpc",
        target_arch = "powerpc64"
    )),
    not(target_has_atomic = "ptr")
))]
mod selected {
    use super::super::fallback::Integer;
    use super::Backend;

    /// The backend this build uses.
    pub const BACKEND: Backend = Backend::Fallback;
    /// Integral atomic on a 1-byte word.
    pub type Atomic8 = Integer<u8>;
    /// Integral atomic on a 2-byte word.
    pub type Atomic16 = Integer<u16>;
    /// Integral atomic on a 4-byte word.
    pub type Atomic32 = Integer<u32>;
    /// Integral atomic on an 8-byte word.
    pub type Atomic64 = Integer<u64>;
    /// Integral atomic on a pointer-sized word.
    pub type AtomicAddr = Integer<usize>;
}

/// The backend this build uses.
pub use selected::BACKEND;

/// Integral atomic on a 1-byte word.
pub use selected::Atomic8;

/// Integral atomic on a 2-byte word.
pub use selected::Atomic16;

/// Integral atomic on a 4-byte word.
pub use selected::Atomic32;

/// Integral atomic on an 8-byte word.
pub use selected::Atomic64;

/// Integral atomic on a pointer-sized word.
pub use selected::AtomicAddr;
