//! Host arrays and their synthesized indexers.

use std::sync::Arc;

use interop_dispatch_runtime::{
    convert, DenseArray, DynamicValue, RuntimeError, RuntimeResult, TypeTag, UserData,
};
use parking_lot::RwLock;

use super::shape::{HostTypeShape, TypeKind};
use crate::descriptor::{param, CallFrame, Invoker, ParameterDescriptor};
use crate::types::{IdentityRelation, ParamType};

/// Marker for the abstract supertype of every array.
#[derive(Debug, Clone, Copy)]
pub struct ArrayBase;

pub fn array_base_tag() -> TypeTag {
    TypeTag::of::<ArrayBase>()
}

/// Script name of an array type, e.g. `Int32[,]` for rank 2.
pub fn array_type_name(element: &ParamType, rank: usize) -> String {
    format!("{}[{}]", element, ",".repeat(rank.saturating_sub(1)))
}

pub fn array_tag(element: &ParamType, rank: usize) -> TypeTag {
    TypeTag::array(&element.to_string(), rank)
}

/// N-dimensional host array shared with scripts.
#[derive(Debug)]
pub struct HostArray {
    element: ParamType,
    data: RwLock<DenseArray>,
}

impl HostArray {
    /// Array of the given shape filled with the element type's zero value.
    pub fn new(element: ParamType, shape: &[usize]) -> Self {
        let fill = element.zero_value();
        Self {
            element,
            data: RwLock::new(DenseArray::filled(shape, fill)),
        }
    }

    pub fn from_values(
        element: ParamType,
        shape: &[usize],
        values: Vec<DynamicValue>,
    ) -> RuntimeResult<Self> {
        let values = values
            .into_iter()
            .map(|v| coerce_element(&element, v))
            .collect::<RuntimeResult<Vec<_>>>()?;
        Ok(Self {
            element,
            data: RwLock::new(DenseArray::from_vec(shape, values)?),
        })
    }

    pub fn element(&self) -> &ParamType {
        &self.element
    }

    pub fn rank(&self) -> usize {
        self.data.read().rank()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.data.read().shape().to_vec()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn tag(&self) -> TypeTag {
        array_tag(&self.element, self.rank())
    }

    pub fn get(&self, indices: &[i64]) -> RuntimeResult<DynamicValue> {
        self.data.read().get(indices)
    }

    pub fn set(&self, indices: &[i64], value: DynamicValue) -> RuntimeResult<()> {
        let value = coerce_element(&self.element, value)?;
        self.data.write().set(indices, value)
    }

    pub fn into_user_data(self) -> UserData {
        let tag = self.tag();
        UserData::from_shared(tag, Arc::new(self))
    }

    pub fn into_value(self) -> DynamicValue {
        DynamicValue::UserData(self.into_user_data())
    }
}

fn coerce_element(element: &ParamType, value: DynamicValue) -> RuntimeResult<DynamicValue> {
    let value = value.scalar().clone();
    match element {
        ParamType::Float64 | ParamType::Float32 => Ok(DynamicValue::Number(convert::to_f64(&value)?)),
        ty if ty.is_numeric() => Ok(DynamicValue::Number(convert::to_i64(&value)? as f64)),
        ParamType::Bool => Ok(DynamicValue::Boolean(convert::to_bool(&value)?)),
        ty if ty.conversion_rank(&value, &IdentityRelation).is_some() => Ok(value),
        ty => Err(RuntimeError::type_error(format!(
            "cannot store {} in an array of {}",
            value.type_name(),
            ty
        ))),
    }
}

/// Shape of an array type; its members are all synthesized.
pub fn array_shape(element: ParamType, rank: usize) -> HostTypeShape {
    let tag = array_tag(&element, rank);
    let name = array_type_name(&element, rank);
    let mut shape = HostTypeShape::new(tag, name, TypeKind::Array { element, rank });
    shape.supertypes.push(array_base_tag());
    shape.internal = true;
    shape
}

pub fn array_base_shape() -> HostTypeShape {
    let mut shape = HostTypeShape::new(array_base_tag(), "Array", TypeKind::ArrayBase);
    shape.internal = true;
    shape
}

fn collect_indices(values: &[DynamicValue]) -> RuntimeResult<Vec<i64>> {
    values.iter().map(convert::to_i64).collect()
}

fn leading_indices(frame: &CallFrame<'_>, rank: usize) -> RuntimeResult<Vec<i64>> {
    let keys = frame.args().get(..rank).ok_or_else(|| {
        RuntimeError::argument_error(format!("array of rank {} needs {} indices", rank, rank))
    })?;
    collect_indices(keys)
}

fn this_array<'a>(frame: &CallFrame<'a>) -> RuntimeResult<&'a HostArray> {
    frame.this::<HostArray>()
}

/// Getter and setter signatures plus invokers for one array rank.
pub(crate) struct SynthesizedIndexer {
    pub get_params: Vec<ParameterDescriptor>,
    pub get: Invoker,
    pub set_params: Vec<ParameterDescriptor>,
    pub set: Invoker,
}

/// One `Int32` index parameter per rank; the setter adds `value`.
pub(crate) fn ranked_indexer(element: &ParamType, rank: usize) -> SynthesizedIndexer {
    let get_params: Vec<_> = (0..rank)
        .map(|i| param(format!("idx{}", i), ParamType::Int32))
        .collect();
    let mut set_params = get_params.clone();
    set_params.push(param("value", element.clone()));

    SynthesizedIndexer {
        get_params,
        get: Invoker::new(move |frame| {
            let array = this_array(frame)?;
            array.get(&leading_indices(frame, rank)?)
        }),
        set_params,
        set: Invoker::new(move |frame| {
            let array = this_array(frame)?;
            array.set(&leading_indices(frame, rank)?, frame.arg(rank).clone())?;
            Ok(DynamicValue::Nil)
        }),
    }
}

/// Rank-agnostic indexers for the array base type.
pub(crate) fn generic_indexer() -> SynthesizedIndexer {
    SynthesizedIndexer {
        get_params: vec![param("indices", ParamType::Int32).variadic()],
        get: Invoker::new(|frame| {
            let array = this_array(frame)?;
            array.get(&collect_indices(frame.rest(0))?)
        }),
        set_params: vec![param("args", ParamType::Dynamic).variadic()],
        set: Invoker::new(|frame| {
            let array = this_array(frame)?;
            let Some((value, indices)) = frame.rest(0).split_last() else {
                return Err(RuntimeError::argument_error("array assignment without a value"));
            };
            array.set(&collect_indices(indices)?, value.clone())?;
            Ok(DynamicValue::Nil)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_names_and_tags() {
        assert_eq!(array_type_name(&ParamType::Int32, 1), "Int32[]");
        assert_eq!(array_type_name(&ParamType::Int32, 3), "Int32[,,]");
        assert_ne!(array_tag(&ParamType::Int32, 1), array_tag(&ParamType::Int32, 2));
        assert_ne!(array_tag(&ParamType::Int32, 1), array_tag(&ParamType::Float64, 1));
        assert_eq!(HostArray::new(ParamType::Int32, &[2, 2]).tag(), array_tag(&ParamType::Int32, 2));
    }

    #[test]
    fn test_element_coercion() {
        let arr = HostArray::new(ParamType::Int32, &[3]);
        assert_eq!(arr.get(&[0]).unwrap(), DynamicValue::Number(0.0));
        arr.set(&[1], DynamicValue::Number(4.0)).unwrap();
        assert_eq!(arr.get(&[1]).unwrap(), DynamicValue::Number(4.0));
        assert!(matches!(
            arr.set(&[1], DynamicValue::Number(4.5)),
            Err(RuntimeError::InexactError(_))
        ));
        assert!(arr.set(&[1], DynamicValue::from("x")).is_err());

        let strings = HostArray::new(ParamType::String, &[1]);
        assert_eq!(strings.get(&[0]).unwrap(), DynamicValue::Nil);
        strings.set(&[0], DynamicValue::from("ok")).unwrap();
    }

    #[test]
    fn test_ranked_indexer_invokers() {
        let arr = HostArray::from_values(
            ParamType::Float64,
            &[2, 2],
            vec![1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()],
        )
        .unwrap();
        let ud = arr.into_user_data();
        let indexer = ranked_indexer(&ParamType::Float64, 2);
        assert_eq!(indexer.get_params.len(), 2);
        assert_eq!(indexer.set_params.len(), 3);

        let mut frame = CallFrame::new(Some(&ud), vec![1.0.into(), 0.0.into()]);
        assert_eq!(indexer.get.invoke(&mut frame).unwrap(), DynamicValue::Number(3.0));

        let mut frame = CallFrame::new(Some(&ud), vec![0.0.into(), 1.0.into(), 9.0.into()]);
        indexer.set.invoke(&mut frame).unwrap();
        assert_eq!(
            ud.downcast_ref::<HostArray>().unwrap().get(&[0, 1]).unwrap(),
            DynamicValue::Number(9.0)
        );
    }
}
