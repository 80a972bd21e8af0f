use std::ffi::c_void;
use std::sync::atomic::AtomicPtr;

use tether_interface::Interface;

/// A tuple of interfaces cached together. The first element is the root interface,
/// which every other interface is queried from.
///
/// Implemented for tuples of one to eight interfaces.
pub trait InterfaceSet {
    type Root: Interface;

    /// One slot per interface, in tuple order.
    type Slots: AsRef<[AtomicPtr<c_void>]> + Default;
}

/// Position of the interface `C` within an [`InterfaceSet`].
///
/// `I` is an [`At`] marker that the compiler infers, so callers write
/// `cache.get::<C, _>()`. An interface that is not part of the set has no `Slot` impl,
/// and a set that names the same interface twice makes the position ambiguous; both are
/// compile errors.
pub trait Slot<C: Interface, I>: InterfaceSet {
    const INDEX: usize;
}

/// Tuple position marker used to select a [`Slot`].
pub struct At<const N: usize>;

macro_rules! interface_set {
    ($len:literal; $gens:tt; $($slot:ident $index:literal),+) => {
        interface_set_impl!($len; $gens);
        $( interface_slot_impl!($gens $slot $index); )+
    };
}

macro_rules! interface_set_impl {
    ($len:literal; [$root:ident $(, $rest:ident)*]) => {
        impl<$root: Interface $(, $rest: Interface)*> InterfaceSet for ($root, $($rest,)*) {
            type Root = $root;
            type Slots = [AtomicPtr<c_void>; $len];
        }
    };
}

macro_rules! interface_slot_impl {
    ([$($all:ident),+] $slot:ident $index:literal) => {
        impl<$($all: Interface),+> Slot<$slot, At<$index>> for ($($all,)+) {
            const INDEX: usize = $index;
        }
    };
}

interface_set!(1; [T0]; T0 0);
interface_set!(2; [T0, T1]; T0 0, T1 1);
interface_set!(3; [T0, T1, T2]; T0 0, T1 1, T2 2);
interface_set!(4; [T0, T1, T2, T3]; T0 0, T1 1, T2 2, T3 3);
interface_set!(5; [T0, T1, T2, T3, T4]; T0 0, T1 1, T2 2, T3 3, T4 4);
interface_set!(6; [T0, T1, T2, T3, T4, T5]; T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
interface_set!(7; [T0, T1, T2, T3, T4, T5, T6]; T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
interface_set!(
    8;
    [T0, T1, T2, T3, T4, T5, T6, T7];
    T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7
);
