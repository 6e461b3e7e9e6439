use crate::entry::EntryId;
use beam_serialize::{ReceiveResult, Receiver, Sender, Shuttle};
use beam_service::Service;

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

shuttle_struct!(EntryIdArgs { id: EntryId });
shuttle_struct!(MakeDirectoryArgs { name: String, parent: EntryId });
shuttle_struct!(MakeValueArgs { name: String, parent: EntryId });
shuttle_struct!(StoreValueArgs { id: EntryId, value: Vec<u8> });
shuttle_struct!(CopyArgs { source: EntryId, new_parent: EntryId, new_name: String });
shuttle_struct!(MoveArgs { id: EntryId, new_parent: EntryId });

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

service!(LoadPathService, "Beam.Registry.LoadPathService", EntryIdArgs, Vec<EntryId>);
service!(LoadParentService, "Beam.Registry.LoadParentService", EntryIdArgs, Option<EntryId>);
service!(LoadChildrenService, "Beam.Registry.LoadChildrenService", EntryIdArgs, Vec<EntryId>);
service!(MakeDirectoryService, "Beam.Registry.MakeDirectoryService", MakeDirectoryArgs, EntryId);
service!(CopyService, "Beam.Registry.CopyService", CopyArgs, EntryId);
service!(MoveService, "Beam.Registry.MoveService", MoveArgs, bool);
service!(LoadValueService, "Beam.Registry.LoadValueService", EntryIdArgs, Vec<u8>);
service!(MakeValueService, "Beam.Registry.MakeValueService", MakeValueArgs, EntryId);
service!(StoreValueService, "Beam.Registry.StoreValueService", StoreValueArgs, bool);
service!(DeleteService, "Beam.Registry.DeleteService", EntryIdArgs, bool);

/// Registered in one fixed order on both client and servlet-side
/// `ServiceSlots`, the same tag-agreement contract the locator's wire
/// module documents.
pub fn register_wire_types(slots: &mut beam_service::ServiceSlots) {
    slots.register_service::<LoadPathService>();
    slots.register_service::<LoadParentService>();
    slots.register_service::<LoadChildrenService>();
    slots.register_service::<MakeDirectoryService>();
    slots.register_service::<CopyService>();
    slots.register_service::<MoveService>();
    slots.register_service::<LoadValueService>();
    slots.register_service::<MakeValueService>();
    slots.register_service::<StoreValueService>();
    slots.register_service::<DeleteService>();
}
