//! Shape helpers. All linear indices are column-major: the first dimension
//! varies fastest.

pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Drop every size-1 axis. A shape that squeezes away entirely becomes `[1]`
/// so a decoded value is never zero-dimensional.
pub fn squeeze(dims: &[usize]) -> Vec<usize> {
    let squeezed: Vec<usize> = dims.iter().copied().filter(|&d| d != 1).collect();
    if squeezed.is_empty() {
        vec![1]
    } else {
        squeezed
    }
}

/// Pad a host shape to the two dimensions libmx requires: `[]` becomes
/// `[1, 1]` and `[n]` becomes `[1, n]`.
pub fn at_least_2d(shape: &[usize]) -> Vec<usize> {
    match shape.len() {
        0 => vec![1, 1],
        1 => vec![1, shape[0]],
        _ => shape.to_vec(),
    }
}

/// MATLAB drops trailing singleton dimensions beyond the second.
pub fn matlab_dims(dims: &[usize]) -> Vec<usize> {
    let mut out = at_least_2d(dims);
    while out.len() > 2 && out[out.len() - 1] == 1 {
        out.pop();
    }
    out
}

/// Column-major linear index of a multi-index, `None` when out of bounds or
/// of the wrong rank.
pub fn index_of(shape: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut linear = 0;
    let mut stride = 1;
    for (&i, &extent) in index.iter().zip(shape) {
        if i >= extent {
            return None;
        }
        linear += i * stride;
        stride *= extent;
    }
    Some(linear)
}

/// Reorder row-major (last index fastest) data into column-major order.
pub fn row_major_to_column_major<T: Clone>(data: &[T], shape: &[usize]) -> Vec<T> {
    let total = numel(shape);
    debug_assert_eq!(data.len(), total);
    if shape.len() < 2 {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(total);
    let mut index = vec![0usize; shape.len()];
    for _ in 0..total {
        // Row-major offset of the current column-major multi-index
        let mut offset = 0;
        for (&i, &extent) in index.iter().zip(shape) {
            offset = offset * extent + i;
        }
        out.push(data[offset].clone());
        for (i, &extent) in index.iter_mut().zip(shape) {
            *i += 1;
            if *i < extent {
                break;
            }
            *i = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeeze_drops_singletons_but_keeps_a_container() {
        assert_eq!(squeeze(&[1, 1, 5]), vec![5]);
        assert_eq!(squeeze(&[3, 1]), vec![3]);
        assert_eq!(squeeze(&[1, 1]), vec![1]);
        assert_eq!(squeeze(&[2, 1, 4]), vec![2, 4]);
        assert_eq!(squeeze(&[0, 0]), vec![0, 0]);
    }

    #[test]
    fn matlab_dims_trim_trailing_singletons() {
        assert_eq!(matlab_dims(&[2, 3, 1]), vec![2, 3]);
        assert_eq!(matlab_dims(&[4]), vec![1, 4]);
        assert_eq!(matlab_dims(&[]), vec![1, 1]);
        assert_eq!(matlab_dims(&[1, 1, 5]), vec![1, 1, 5]);
    }

    #[test]
    fn index_of_is_column_major() {
        let shape = [2, 3];
        assert_eq!(index_of(&shape, &[1, 0]), Some(1));
        assert_eq!(index_of(&shape, &[0, 1]), Some(2));
        assert_eq!(index_of(&shape, &[1, 2]), Some(5));
        assert_eq!(index_of(&shape, &[2, 0]), None);
        assert_eq!(index_of(&shape, &[0]), None);
    }

    #[test]
    fn reorders_row_major_input() {
        // [[1, 2, 3], [4, 5, 6]]
        let data = [1, 2, 3, 4, 5, 6];
        assert_eq!(row_major_to_column_major(&data, &[2, 3]), vec![1, 4, 2, 5, 3, 6]);
        let cube: Vec<usize> = (0..8).collect();
        let col = row_major_to_column_major(&cube, &[2, 2, 2]);
        // element (i, j, k) lives at row-major offset 4i + 2j + k
        assert_eq!(col[index_of(&[2, 2, 2], &[1, 0, 1]).unwrap()], 5);
        assert_eq!(col[index_of(&[2, 2, 2], &[0, 1, 1]).unwrap()], 3);
    }
}
