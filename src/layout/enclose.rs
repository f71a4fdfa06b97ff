//! Sibling placement and minimal enclosing circles.
//!
//! `pack_siblings` places circles tangent to each other along a front
//! chain, always attaching the next circle next to the chain link closest
//! to the origin, then recenters the group on its minimal enclosing
//! circle. The enclosing circle is found incrementally: whenever a circle
//! falls outside the current candidate, the support basis (at most three
//! circles) is extended and the scan restarts.

use super::Circle;

/// Place `circles` without overlap and return the radius of the smallest
/// circle enclosing them. Positions are rewritten relative to its center.
pub fn pack_siblings(circles: &mut [Circle]) -> f64 {
    let n = circles.len();
    if n == 0 {
        return 0.0;
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return circles[0].r;
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return circles[0].r + circles[1].r;
    }

    let (first, second) = (circles[0], circles[1]);
    place(&second, &first, &mut circles[2]);

    // Front chain as a circular doubly-linked list over circle indices.
    let mut next = vec![0usize; n];
    let mut prev = vec![0usize; n];
    let (mut a, mut b) = (0usize, 1usize);
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let mut i = 3;
    'pack: while i < n {
        let (ca, cb) = (circles[a], circles[b]);
        place(&ca, &cb, &mut circles[i]);
        let c = i;

        // Find the closest intersecting circle on the front chain, if any.
        let mut j = next[b];
        let mut k = prev[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        // Insert the new circle between a and b.
        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // Pick the chain link whose tangent point is closest to the origin.
        let mut best = score(&circles, a, next[a]);
        let mut cursor = next[c];
        while cursor != b {
            let s = score(&circles, cursor, next[cursor]);
            if s < best {
                a = cursor;
                best = s;
            }
            cursor = next[cursor];
        }
        b = next[a];
        i += 1;
    }

    let mut chain = vec![circles[b]];
    let mut cursor = next[b];
    while cursor != b {
        chain.push(circles[cursor]);
        cursor = next[cursor];
    }

    let e = enclose(&chain);
    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }
    e.r
}

/// Smallest circle enclosing all `circles`.
pub fn enclose(circles: &[Circle]) -> Circle {
    let mut basis: Vec<Circle> = Vec::with_capacity(3);
    let mut e: Option<Circle> = None;
    let mut i = 0;

    while i < circles.len() {
        let p = circles[i];
        match e {
            Some(current) if encloses_weak(&current, &p) => i += 1,
            _ => match extend_basis(&basis, p) {
                Some(extended) => {
                    basis = extended;
                    e = Some(enclose_basis(&basis));
                    i = 0;
                }
                None => {
                    log::warn!("enclosing circle did not converge, using bounding circle");
                    return bounding_circle(circles);
                }
            },
        }
    }

    e.unwrap_or_default()
}

fn extend_basis(basis: &[Circle], p: Circle) -> Option<Vec<Circle>> {
    if encloses_weak_all(&p, basis) {
        return Some(vec![p]);
    }

    for bi in basis {
        if encloses_not(&p, bi) && encloses_weak_all(&enclose_basis2(bi, &p), basis) {
            return Some(vec![*bi, p]);
        }
    }

    for (i, bi) in basis.iter().enumerate() {
        for bj in &basis[i + 1..] {
            if encloses_not(&enclose_basis2(bi, bj), &p)
                && encloses_not(&enclose_basis2(bi, &p), bj)
                && encloses_not(&enclose_basis2(bj, &p), bi)
                && encloses_weak_all(&enclose_basis3(bi, bj, &p), basis)
            {
                return Some(vec![*bi, *bj, p]);
            }
        }
    }

    None
}

fn encloses_not(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr < 0.0 || dr * dr < dx * dx + dy * dy
}

fn encloses_weak(a: &Circle, b: &Circle) -> bool {
    let dr = a.r - b.r + a.r.max(b.r).max(1.0) * 1e-9;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

fn encloses_weak_all(a: &Circle, basis: &[Circle]) -> bool {
    basis.iter().all(|b| encloses_weak(a, b))
}

fn enclose_basis(basis: &[Circle]) -> Circle {
    match basis {
        [a] => *a,
        [a, b] => enclose_basis2(a, b),
        [a, b, c] => enclose_basis3(a, b, c),
        _ => Circle::default(),
    }
}

fn enclose_basis2(a: &Circle, b: &Circle) -> Circle {
    let x21 = b.x - a.x;
    let y21 = b.y - a.y;
    let r21 = b.r - a.r;
    let l = (x21 * x21 + y21 * y21).sqrt();
    if l == 0.0 {
        return if a.r >= b.r { *a } else { *b };
    }
    Circle {
        x: (a.x + b.x + x21 / l * r21) / 2.0,
        y: (a.y + b.y + y21 / l * r21) / 2.0,
        r: (l + a.r + b.r) / 2.0,
    }
}

fn enclose_basis3(a: &Circle, b: &Circle, c: &Circle) -> Circle {
    let (x1, y1, r1) = (a.x, a.y, a.r);
    let (x2, y2, r2) = (b.x, b.y, b.r);
    let (x3, y3, r3) = (c.x, c.y, c.r);

    let a2 = x1 - x2;
    let a3 = x1 - x3;
    let b2 = y1 - y2;
    let b3 = y1 - y3;
    let c2 = r2 - r1;
    let c3 = r3 - r1;
    let d1 = x1 * x1 + y1 * y1 - r1 * r1;
    let d2 = d1 - x2 * x2 - y2 * y2 + r2 * r2;
    let d3 = d1 - x3 * x3 - y3 * y3 + r3 * r3;
    let ab = a3 * b2 - a2 * b3;
    let xa = (b2 * d3 - b3 * d2) / (ab * 2.0) - x1;
    let xb = (b3 * c2 - b2 * c3) / ab;
    let ya = (a3 * d2 - a2 * d3) / (ab * 2.0) - y1;
    let yb = (a2 * c3 - a3 * c2) / ab;
    let qa = xb * xb + yb * yb - 1.0;
    let qb = 2.0 * (r1 + xa * xb + ya * yb);
    let qc = xa * xa + ya * ya - r1 * r1;
    let r = -(if qa.abs() > 1e-6 {
        (qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
    } else {
        qc / qb
    });

    Circle {
        x: x1 + xa + xb * r,
        y: y1 + ya + yb * r,
        r,
    }
}

/// Fallback for numerically hopeless input: centroid plus farthest reach.
fn bounding_circle(circles: &[Circle]) -> Circle {
    let n = circles.len().max(1) as f64;
    let cx = circles.iter().map(|c| c.x).sum::<f64>() / n;
    let cy = circles.iter().map(|c| c.y).sum::<f64>() / n;
    let r = circles
        .iter()
        .map(|c| ((c.x - cx).powi(2) + (c.y - cy).powi(2)).sqrt() + c.r)
        .fold(0.0, f64::max);
    Circle { x: cx, y: cy, r }
}

/// Place `c` tangent to both `a` and `b`.
fn place(b: &Circle, a: &Circle, c: &mut Circle) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;

    if d2 > 0.0 {
        let a2 = (a.r + c.r).powi(2);
        let b2 = (b.r + c.r).powi(2);
        if a2 > b2 {
            let x = (d2 + b2 - a2) / (2.0 * d2);
            let y = (b2 / d2 - x * x).max(0.0).sqrt();
            c.x = b.x - x * dx - y * dy;
            c.y = b.y - x * dy + y * dx;
        } else {
            let x = (d2 + a2 - b2) / (2.0 * d2);
            let y = (a2 / d2 - x * x).max(0.0).sqrt();
            c.x = a.x + x * dx - y * dy;
            c.y = a.y + x * dy + y * dx;
        }
    } else {
        c.x = a.x + c.r;
        c.y = a.y;
    }
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted tangent point of `a`
/// and `b`.
fn score(circles: &[Circle], a: usize, b: usize) -> f64 {
    let (a, b) = (&circles[a], &circles[b]);
    let ab = a.r + b.r;
    if ab == 0.0 {
        return a.x * a.x + a.y * a.y;
    }
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn circles(radii: &[f64]) -> Vec<Circle> {
        radii.iter().map(|&r| Circle { x: 0.0, y: 0.0, r }).collect()
    }

    fn assert_valid(packed: &[Circle], r: f64) {
        for (i, a) in packed.iter().enumerate() {
            let reach = (a.x * a.x + a.y * a.y).sqrt() + a.r;
            assert!(reach <= r + EPS * r.max(1.0), "circle {i} escapes: {reach} > {r}");
            for b in &packed[i + 1..] {
                let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(d >= a.r + b.r - EPS * r.max(1.0), "overlap: {d} < {}", a.r + b.r);
            }
        }
    }

    #[test]
    fn test_single_and_pair() {
        let mut one = circles(&[3.0]);
        assert_eq!(pack_siblings(&mut one), 3.0);

        let mut two = circles(&[1.0, 2.0]);
        assert_eq!(pack_siblings(&mut two), 3.0);
        assert_valid(&two, 3.0);
    }

    #[test]
    fn test_three_equal_circles() {
        let mut three = circles(&[1.0, 1.0, 1.0]);
        let r = pack_siblings(&mut three);
        // Circumradius of the triangle plus one radius.
        let expected = 2.0 / 3f64.sqrt() + 1.0;
        assert!((r - expected).abs() < 1e-9, "{r} vs {expected}");
        assert_valid(&three, r);
    }

    #[test]
    fn test_many_mixed_circles() {
        let radii: Vec<f64> = (1..=40).map(|i| ((i * 7919) % 13 + 1) as f64).collect();
        let mut packed = circles(&radii);
        let r = pack_siblings(&mut packed);
        assert_valid(&packed, r);
        // Enclosing circle cannot be smaller than the total area suggests.
        let area: f64 = radii.iter().map(|r| r * r).sum();
        assert!(r * r >= area);
    }

    #[test]
    fn test_zero_radius_circles() {
        let mut packed = circles(&[0.0, 0.0, 0.0, 0.0]);
        let r = pack_siblings(&mut packed);
        assert_eq!(r, 0.0);
        assert!(packed.iter().all(|c| c.x.is_finite() && c.y.is_finite()));
    }

    #[test]
    fn test_enclose_two_disjoint() {
        let e = enclose(&[
            Circle { x: -5.0, y: 0.0, r: 1.0 },
            Circle { x: 5.0, y: 0.0, r: 1.0 },
        ]);
        assert!((e.x).abs() < 1e-9);
        assert!((e.r - 6.0).abs() < 1e-9);
    }
}
