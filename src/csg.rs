// CSG (Constructive Solid Geometry) operations on samples
//
// These combine two evaluated samples into the sample of a boolean
// combination:
// - union:        inside A or B, distance min
// - intersection: inside A and B, distance max
// - difference:   inside A and not B, distance max of A and negated B
//
// `inside` is combined logically so the set algebra holds exactly, including
// on coincident surfaces. Tags and normal come from whichever operand's
// surface wins the distance comparison; the second operand (the most
// recently combined one) wins ties.

use crate::types::Sample;

/// Boolean union (logical OR).
pub fn union(a: Sample, b: Sample) -> Sample {
    let winner = if b.distance <= a.distance { b } else { a };
    Sample { inside: a.inside || b.inside, ..winner }
}

/// Boolean intersection (logical AND).
pub fn intersection(a: Sample, b: Sample) -> Sample {
    let winner = if b.distance >= a.distance { b } else { a };
    Sample { inside: a.inside && b.inside, ..winner }
}

/// Boolean difference: A minus B.
/// Where B's surface wins, the result carries B's tags with its normal
/// flipped to point out of the remaining material.
pub fn difference(a: Sample, b: Sample) -> Sample {
    let nb = b.complement();
    let winner = if nb.distance >= a.distance { nb } else { a };
    Sample { inside: a.inside && !b.inside, ..winner }
}
