use cmt_core::Hasher;

use crate::node::Node;

/// Rotates `x`'s left child up.
///
/// ```text
/// rotate_right(X):
///     X              Y
///    / \            / \
///   Y   C   -->    A   X
///  / \                / \
/// A   B              B   C
/// ```
///
/// Refreshes the two affected hashes in the correct order: the sinking
/// node (`x`) first, then the rising node (`y`). Panics if `x` has no
/// left child — calling a rotation on a node missing the required child
/// is a caller bug, not a runtime error (see the crate's error handling
/// notes).
pub(crate) fn rotate_right<H: Hasher>(mut x: Box<Node<H>>) -> Box<Node<H>> {
    let mut y = x.left.take().expect("rotate_right requires a left child");

    x.left = y.right.take();
    x.refresh_hash();

    y.right = Some(x);
    y.refresh_hash();

    y
}

/// Rotates `x`'s right child up.
///
/// ```text
/// rotate_left(X):
///     X                 Y
///    / \                / \
///   A   Y     -->      X   C
///      / \            / \
///     B   C          A   B
/// ```
///
/// Mirror of [`rotate_right`]; same hash-refresh ordering and the same
/// panic-on-missing-child contract.
pub(crate) fn rotate_left<H: Hasher>(mut x: Box<Node<H>>) -> Box<Node<H>> {
    let mut y = x.right.take().expect("rotate_left requires a right child");

    x.right = y.left.take();
    x.refresh_hash();

    y.left = Some(x);
    y.refresh_hash();

    y
}
