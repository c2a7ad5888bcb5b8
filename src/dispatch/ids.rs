/*!
Capability ids.

Each function table namespace has its own closed enumeration. Ids are
stable for the lifetime of the protocol version; new ids may be appended
(older peers skip them) but existing ids are never renumbered. Zero is
reserved for the table terminator in every namespace.
*/

use std::fmt;

/// Reserved terminator id
pub const END: u32 = 0;

macro_rules! capability_ids {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident = $id:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $id,)+
        }

        impl $name {
            /// Every id in this namespace, in ascending order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Numeric id carried in a function table
            pub const fn id(self) -> u32 {
                self as u32
            }

            /// Map a numeric id back to a known capability
            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Short human-readable name
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", self.name(), self.id())
            }
        }
    };
}

capability_ids! {
    /// Functions the host ("core") hands to a provider
    CoreCapability {
        GetParamTypes = 1 => "core-get-param-types",
        GetParams = 2 => "core-get-params",
        PutError = 3 => "core-put-error",
        AddErrorData = 4 => "core-add-error-data",
        Malloc = 10 => "malloc",
        Zalloc = 11 => "zalloc",
        Free = 14 => "free",
        ClearFree = 15 => "clear-free",
        SecureZalloc = 18 => "secure-zalloc",
        SecureClearFree = 20 => "secure-clear-free",
        SecureMallocInitialized = 21 => "secure-malloc-initialized",
        Cleanse = 22 => "cleanse",
    }
}

capability_ids! {
    /// Functions a provider hands back to the host
    ProviderCapability {
        Teardown = 1024 => "provider-teardown",
        GetParamTypes = 1025 => "provider-get-param-types",
        GetParams = 1026 => "provider-get-params",
        QueryOperation = 1027 => "provider-query-operation",
    }
}

capability_ids! {
    /// Functions of a digest algorithm table
    DigestCapability {
        NewCtx = 1 => "digest-newctx",
        Init = 2 => "digest-init",
        Update = 3 => "digest-update",
        Final = 4 => "digest-final",
        OneShot = 5 => "digest-oneshot",
        FreeCtx = 6 => "digest-freectx",
        DupCtx = 7 => "digest-dupctx",
        Size = 8 => "digest-size",
        BlockSize = 9 => "digest-block-size",
    }
}

capability_ids! {
    /// Functions of a MAC algorithm table
    MacCapability {
        NewCtx = 1 => "mac-newctx",
        Init = 2 => "mac-init",
        Update = 3 => "mac-update",
        Final = 4 => "mac-final",
        FreeCtx = 5 => "mac-freectx",
        DupCtx = 6 => "mac-dupctx",
        SetCtxParams = 7 => "mac-set-ctx-params",
        Size = 8 => "mac-size",
    }
}
