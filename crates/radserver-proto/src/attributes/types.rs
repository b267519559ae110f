use crate::codec::DataType;

macro_rules! attribute_types {
    ($( $(#[$doc:meta])* $variant:ident = $value:literal, $name:literal, $datatype:ident; )+) => {
        /// Standard RADIUS attribute types registered by
        /// [`Dictionary::builtin`](crate::Dictionary::builtin)
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum AttributeType {
            $( $(#[$doc])* $variant = $value, )+
        }

        impl AttributeType {
            /// Every built-in attribute type, in ascending type order
            pub const ALL: &'static [AttributeType] = &[ $( AttributeType::$variant, )+ ];

            /// Dictionary name, e.g. `"User-Name"`
            pub fn name(self) -> &'static str {
                match self {
                    $( AttributeType::$variant => $name, )+
                }
            }

            /// Datatype the built-in dictionary registers for this attribute
            pub fn data_type(self) -> DataType {
                match self {
                    $( AttributeType::$variant => DataType::$datatype, )+
                }
            }
        }
    };
}

attribute_types! {
    /// User-Name (1) - RFC 2865
    UserName = 1, "User-Name", String;
    /// User-Password (2) - RFC 2865, obfuscated on the wire
    UserPassword = 2, "User-Password", Octets;
    /// CHAP-Password (3) - RFC 2865
    ChapPassword = 3, "CHAP-Password", Octets;
    /// NAS-IP-Address (4) - RFC 2865
    NasIpAddress = 4, "NAS-IP-Address", IpAddr;
    /// NAS-Port (5) - RFC 2865
    NasPort = 5, "NAS-Port", Integer;
    /// Service-Type (6) - RFC 2865
    ServiceType = 6, "Service-Type", Integer;
    /// Framed-Protocol (7) - RFC 2865
    FramedProtocol = 7, "Framed-Protocol", Integer;
    /// Framed-IP-Address (8) - RFC 2865
    FramedIpAddress = 8, "Framed-IP-Address", IpAddr;
    /// Framed-IP-Netmask (9) - RFC 2865
    FramedIpNetmask = 9, "Framed-IP-Netmask", IpAddr;
    /// Framed-Routing (10) - RFC 2865
    FramedRouting = 10, "Framed-Routing", Integer;
    /// Filter-Id (11) - RFC 2865
    FilterId = 11, "Filter-Id", String;
    /// Framed-MTU (12) - RFC 2865
    FramedMtu = 12, "Framed-MTU", Integer;
    /// Framed-Compression (13) - RFC 2865
    FramedCompression = 13, "Framed-Compression", Integer;
    /// Login-IP-Host (14) - RFC 2865
    LoginIpHost = 14, "Login-IP-Host", IpAddr;
    /// Login-Service (15) - RFC 2865
    LoginService = 15, "Login-Service", Integer;
    /// Login-TCP-Port (16) - RFC 2865
    LoginTcpPort = 16, "Login-TCP-Port", Integer;
    /// Reply-Message (18) - RFC 2865
    ReplyMessage = 18, "Reply-Message", String;
    /// Callback-Number (19) - RFC 2865
    CallbackNumber = 19, "Callback-Number", String;
    /// Callback-Id (20) - RFC 2865
    CallbackId = 20, "Callback-Id", String;
    /// Framed-Route (22) - RFC 2865
    FramedRoute = 22, "Framed-Route", String;
    /// Framed-IPX-Network (23) - RFC 2865
    FramedIpxNetwork = 23, "Framed-IPX-Network", IpAddr;
    /// State (24) - RFC 2865
    State = 24, "State", Octets;
    /// Class (25) - RFC 2865
    Class = 25, "Class", Octets;
    /// Vendor-Specific (26) - RFC 2865
    VendorSpecific = 26, "Vendor-Specific", Octets;
    /// Session-Timeout (27) - RFC 2865
    SessionTimeout = 27, "Session-Timeout", Integer;
    /// Idle-Timeout (28) - RFC 2865
    IdleTimeout = 28, "Idle-Timeout", Integer;
    /// Termination-Action (29) - RFC 2865
    TerminationAction = 29, "Termination-Action", Integer;
    /// Called-Station-Id (30) - RFC 2865
    CalledStationId = 30, "Called-Station-Id", String;
    /// Calling-Station-Id (31) - RFC 2865
    CallingStationId = 31, "Calling-Station-Id", String;
    /// NAS-Identifier (32) - RFC 2865
    NasIdentifier = 32, "NAS-Identifier", String;
    /// Proxy-State (33) - RFC 2865
    ProxyState = 33, "Proxy-State", Octets;
    /// Login-LAT-Service (34) - RFC 2865
    LoginLatService = 34, "Login-LAT-Service", String;
    /// Login-LAT-Node (35) - RFC 2865
    LoginLatNode = 35, "Login-LAT-Node", String;
    /// Login-LAT-Group (36) - RFC 2865
    LoginLatGroup = 36, "Login-LAT-Group", Octets;
    /// Framed-AppleTalk-Link (37) - RFC 2865
    FramedAppleTalkLink = 37, "Framed-AppleTalk-Link", Integer;
    /// Framed-AppleTalk-Network (38) - RFC 2865
    FramedAppleTalkNetwork = 38, "Framed-AppleTalk-Network", Integer;
    /// Framed-AppleTalk-Zone (39) - RFC 2865
    FramedAppleTalkZone = 39, "Framed-AppleTalk-Zone", String;
    /// Acct-Status-Type (40) - RFC 2866
    AcctStatusType = 40, "Acct-Status-Type", Integer;
    /// Acct-Delay-Time (41) - RFC 2866
    AcctDelayTime = 41, "Acct-Delay-Time", Integer;
    /// Acct-Input-Octets (42) - RFC 2866
    AcctInputOctets = 42, "Acct-Input-Octets", Integer;
    /// Acct-Output-Octets (43) - RFC 2866
    AcctOutputOctets = 43, "Acct-Output-Octets", Integer;
    /// Acct-Session-Id (44) - RFC 2866
    AcctSessionId = 44, "Acct-Session-Id", String;
    /// Acct-Authentic (45) - RFC 2866
    AcctAuthentic = 45, "Acct-Authentic", Integer;
    /// Acct-Session-Time (46) - RFC 2866
    AcctSessionTime = 46, "Acct-Session-Time", Integer;
    /// Acct-Input-Packets (47) - RFC 2866
    AcctInputPackets = 47, "Acct-Input-Packets", Integer;
    /// Acct-Output-Packets (48) - RFC 2866
    AcctOutputPackets = 48, "Acct-Output-Packets", Integer;
    /// Acct-Terminate-Cause (49) - RFC 2866
    AcctTerminateCause = 49, "Acct-Terminate-Cause", Integer;
    /// Acct-Multi-Session-Id (50) - RFC 2866
    AcctMultiSessionId = 50, "Acct-Multi-Session-Id", String;
    /// Acct-Link-Count (51) - RFC 2866
    AcctLinkCount = 51, "Acct-Link-Count", Integer;
    /// Acct-Input-Gigawords (52) - RFC 2869
    /// High 32 bits of 64-bit Acct-Input-Octets counter
    AcctInputGigawords = 52, "Acct-Input-Gigawords", Integer;
    /// Acct-Output-Gigawords (53) - RFC 2869
    /// High 32 bits of 64-bit Acct-Output-Octets counter
    AcctOutputGigawords = 53, "Acct-Output-Gigawords", Integer;
    /// Event-Timestamp (55) - RFC 2869
    EventTimestamp = 55, "Event-Timestamp", Date;
    /// CHAP-Challenge (60) - RFC 2865
    ChapChallenge = 60, "CHAP-Challenge", Octets;
    /// NAS-Port-Type (61) - RFC 2865
    NasPortType = 61, "NAS-Port-Type", Integer;
    /// Port-Limit (62) - RFC 2865
    PortLimit = 62, "Port-Limit", Integer;
    /// Login-LAT-Port (63) - RFC 2865
    LoginLatPort = 63, "Login-LAT-Port", String;
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_u8() == value)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
