//! Standard attribute codes the codec itself relies on (RFC 2865/2866)

/// User-Name (1)
pub const USER_NAME: u8 = 1;
/// User-Password (2), MD5-XOR encrypted
pub const USER_PASSWORD: u8 = 2;
/// CHAP-Password (3): CHAP ident + 16 byte response
pub const CHAP_PASSWORD: u8 = 3;
/// NAS-IP-Address (4)
pub const NAS_IP_ADDRESS: u8 = 4;
/// Reply-Message (18)
pub const REPLY_MESSAGE: u8 = 18;
/// Vendor-Specific (26), reserved for the vendor container format
pub const VENDOR_SPECIFIC: u8 = 26;
/// Proxy-State (33), echoed unchanged in responses
pub const PROXY_STATE: u8 = 33;
/// Acct-Status-Type (40) - RFC 2866
pub const ACCT_STATUS_TYPE: u8 = 40;
/// CHAP-Challenge (60)
pub const CHAP_CHALLENGE: u8 = 60;
