use crate::entry::EntryId;
use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
use beam_service::{RecordMessageType, Service};

/// Generates a `Shuttle` struct from a field list, in the same shape as
/// `beam_auth::SendSessionIdArgs`'s hand-written impl — with this many
/// wire structs, a declarative macro keeps each one to its field list.
macro_rules! shuttle_struct {
    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $(pub $field: $ty,)*
        }

        impl Shuttle for $name {
            fn send<S: Sender>(&self, sender: &mut S, version: u32) {
                $(self.$field.send(sender, version);)*
            }

            #[allow(unused_variables)]
            fn receive<R: Receiver>(receiver: &mut R, version: u32) -> ReceiveResult<Self> {
                $(let $field = <$ty as Shuttle>::receive(receiver, version)?;)*
                Ok($name { $($field),* })
            }
        }
    };
}

/// Placeholder args/body for services and messages that carry nothing.
shuttle_struct!(Empty {});

shuttle_struct!(LoginArgs { name: String, password: String });
shuttle_struct!(LoginResult { account: EntryId, session_id: String });
shuttle_struct!(SessionAuthenticationArgs { key: String, sha: String });

shuttle_struct!(RegisterArgs { name: String, properties: String, owner: EntryId });
shuttle_struct!(UnregisterArgs { name: String, id: i32 });
shuttle_struct!(LocateArgs { name: String });
shuttle_struct!(ServiceEntryInfo { id: i32, name: String, properties: String, owner: EntryId });
shuttle_struct!(SubscribeAvailabilityArgs { name: String });

shuttle_struct!(MonitorDirectoryEntryArgs { id: EntryId });

shuttle_struct!(DirectoryEntryInfo { kind: u8, id: EntryId, name: String });
shuttle_struct!(FindAccountArgs { name: String });
shuttle_struct!(MakeAccountArgs { name: String, password: String, parent: EntryId });
shuttle_struct!(MakeDirectoryArgs { name: String, parent: EntryId });
shuttle_struct!(EntryIdArgs { id: EntryId });
shuttle_struct!(AssociationArgs { child: EntryId, parent: EntryId });
shuttle_struct!(StorePasswordArgs { account: EntryId, password: String });
shuttle_struct!(PermissionsArgs { source: EntryId, target: EntryId, mask: u8 });
shuttle_struct!(RenameArgs { id: EntryId, name: String });
shuttle_struct!(AuthenticateAccountArgs { name: String, password: String });

shuttle_struct!(DirectoryEntryAssociatedBody { child: EntryId, parent: EntryId });
shuttle_struct!(DirectoryEntryDetachedBody { child: EntryId, parent: EntryId });
shuttle_struct!(ServiceAvailabilityBody { name: String, available: bool });
shuttle_struct!(AccountUpdateBody { account: EntryId });

macro_rules! service {
    ($name:ident, $uid:expr, $args:ty, $ret:ty) => {
        pub struct $name;
        impl Service for $name {
            const UID: &'static str = $uid;
            type Args = $args;
            type Return = $ret;
        }
    };
}

macro_rules! message {
    ($name:ident, $uid:expr, $body:ty) => {
        pub struct $name;
        impl RecordMessageType for $name {
            const UID: &'static str = $uid;
            type Body = $body;
        }
    };
}

// Ungated — available before a session has logged in (§4.9).
service!(LoginService, "Beam.Locator.LoginService", LoginArgs, LoginResult);
service!(SessionAuthenticationService, "Beam.Locator.SessionAuthenticationService", SessionAuthenticationArgs, bool);

// Gated behind a logged-in session.
service!(RegisterService, "Beam.Locator.RegisterService", RegisterArgs, i32);
service!(UnregisterService, "Beam.Locator.UnregisterService", UnregisterArgs, bool);
service!(LocateService, "Beam.Locator.LocateService", LocateArgs, Vec<ServiceEntryInfo>);
service!(SubscribeAvailabilityService, "Beam.Locator.SubscribeAvailabilityService", SubscribeAvailabilityArgs, bool);
service!(UnsubscribeAvailabilityService, "Beam.Locator.UnsubscribeAvailabilityService", SubscribeAvailabilityArgs, bool);
service!(MonitorDirectoryEntryService, "Beam.Locator.MonitorDirectoryEntryService", MonitorDirectoryEntryArgs, bool);
service!(MonitorAccountsService, "Beam.Locator.MonitorAccountsService", Empty, bool);
service!(UnmonitorAccountsService, "Beam.Locator.UnmonitorAccountsService", Empty, bool);
service!(LoadPathService, "Beam.Locator.LoadPathService", EntryIdArgs, Vec<EntryId>);
service!(LoadDirectoryEntryService, "Beam.Locator.LoadDirectoryEntryService", EntryIdArgs, DirectoryEntryInfo);
service!(LoadParentsService, "Beam.Locator.LoadParentsService", EntryIdArgs, Vec<EntryId>);
service!(LoadChildrenService, "Beam.Locator.LoadChildrenService", EntryIdArgs, Vec<EntryId>);
service!(LoadAllAccountsService, "Beam.Locator.LoadAllAccountsService", Empty, Vec<EntryId>);
service!(FindAccountService, "Beam.Locator.FindAccountService", FindAccountArgs, Option<EntryId>);
service!(MakeAccountService, "Beam.Locator.MakeAccountService", MakeAccountArgs, EntryId);
service!(MakeDirectoryService, "Beam.Locator.MakeDirectoryService", MakeDirectoryArgs, EntryId);
service!(DeleteDirectoryEntryService, "Beam.Locator.DeleteDirectoryEntryService", EntryIdArgs, bool);
service!(AssociateService, "Beam.Locator.AssociateService", AssociationArgs, bool);
service!(DetachService, "Beam.Locator.DetachService", AssociationArgs, bool);
service!(StorePasswordService, "Beam.Locator.StorePasswordService", StorePasswordArgs, bool);
service!(HasPermissionsService, "Beam.Locator.HasPermissionsService", PermissionsArgs, bool);
service!(StorePermissionsService, "Beam.Locator.StorePermissionsService", PermissionsArgs, bool);
service!(LoadRegistrationTimeService, "Beam.Locator.LoadRegistrationTimeService", EntryIdArgs, Option<u64>);
service!(LoadLastLoginTimeService, "Beam.Locator.LoadLastLoginTimeService", EntryIdArgs, Option<u64>);
service!(RenameService, "Beam.Locator.RenameService", RenameArgs, bool);
service!(AuthenticateAccountService, "Beam.Locator.AuthenticateAccountService", AuthenticateAccountArgs, bool);

message!(DirectoryEntryAssociatedMessage, "Beam.Locator.DirectoryEntryAssociatedMessage", DirectoryEntryAssociatedBody);
message!(DirectoryEntryDetachedMessage, "Beam.Locator.DirectoryEntryDetachedMessage", DirectoryEntryDetachedBody);
message!(ServiceAvailabilityMessage, "Beam.Locator.ServiceAvailabilityMessage", ServiceAvailabilityBody);
message!(AccountUpdateMessage, "Beam.Locator.AccountUpdateMessage", AccountUpdateBody);

/// Registers every service and message UID documented for the locator
/// in one fixed order, so a client built independently of the servlet
/// still assigns the same tags to the same UIDs (`ServiceSlots::Add`'s
/// contract, §4.7). Both `ServiceLocatorServlet::register_services` and
/// `ServiceLocatorClient::new` call this against their own
/// `ServiceSlots` before adding anything else.
pub fn register_wire_types(slots: &mut beam_service::ServiceSlots) {
    slots.register_service::<LoginService>();
    slots.register_service::<SessionAuthenticationService>();
    slots.register_service::<RegisterService>();
    slots.register_service::<UnregisterService>();
    slots.register_service::<LocateService>();
    slots.register_service::<SubscribeAvailabilityService>();
    slots.register_service::<UnsubscribeAvailabilityService>();
    slots.register_service::<MonitorDirectoryEntryService>();
    slots.register_service::<MonitorAccountsService>();
    slots.register_service::<UnmonitorAccountsService>();
    slots.register_service::<LoadPathService>();
    slots.register_service::<LoadDirectoryEntryService>();
    slots.register_service::<LoadParentsService>();
    slots.register_service::<LoadChildrenService>();
    slots.register_service::<LoadAllAccountsService>();
    slots.register_service::<FindAccountService>();
    slots.register_service::<MakeAccountService>();
    slots.register_service::<MakeDirectoryService>();
    slots.register_service::<DeleteDirectoryEntryService>();
    slots.register_service::<AssociateService>();
    slots.register_service::<DetachService>();
    slots.register_service::<StorePasswordService>();
    slots.register_service::<HasPermissionsService>();
    slots.register_service::<StorePermissionsService>();
    slots.register_service::<LoadRegistrationTimeService>();
    slots.register_service::<LoadLastLoginTimeService>();
    slots.register_service::<RenameService>();
    slots.register_service::<AuthenticateAccountService>();
    slots.register_message::<DirectoryEntryAssociatedMessage>();
    slots.register_message::<DirectoryEntryDetachedMessage>();
    slots.register_message::<ServiceAvailabilityMessage>();
    slots.register_message::<AccountUpdateMessage>();
}
